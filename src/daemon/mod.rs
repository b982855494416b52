//! Daemon module for the countdown timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: countdown engine with its state machine
//! - `ticker`: repeating tick streams per session
//! - `ipc`: Unix socket server and request dispatch
//!
//! Everything runs on one task: [`Daemon::run`] waits on client connections,
//! tick/alarm wake-ups and Ctrl-C, and handles them one at a time.

pub mod ipc;
pub mod ticker;
pub mod timer;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmScheduler, SystemAlarm};
use crate::config::CountdownConfig;
use crate::notification::{Notifier, SystemNotifier};
use crate::store::{FileTriggerStore, TriggerStore};
use crate::time::{Clock, SystemClock};
use crate::types::{IpcRequest, IpcResponse};

pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use ticker::{ManualTicker, TickScheduler, TokioTicker, Wakeup};
pub use timer::{CountdownTimer, RestoreOutcome, TimerError, TimerSettings};

// ============================================================================
// Daemon
// ============================================================================

/// A connection together with the request read from it.
type ReceivedRequest = (UnixStream, Result<IpcRequest>);

/// The daemon event loop.
pub struct Daemon<S, A, N> {
    server: IpcServer,
    engine: Arc<Mutex<CountdownTimer<S, A, N>>>,
    handler: RequestHandler<S, A, N>,
    wakeup_rx: mpsc::UnboundedReceiver<Wakeup>,
}

impl<S, A, N> Daemon<S, A, N>
where
    S: TriggerStore,
    A: AlarmScheduler,
    N: Notifier,
{
    /// Creates a daemon serving `engine` on `server`.
    ///
    /// `wakeup_rx` must be the receiving end of the channel given to the
    /// engine's ticker and alarm.
    pub fn new(
        server: IpcServer,
        engine: CountdownTimer<S, A, N>,
        wakeup_rx: mpsc::UnboundedReceiver<Wakeup>,
    ) -> Self {
        let engine = Arc::new(Mutex::new(engine));
        let handler = RequestHandler::new(Arc::clone(&engine));
        Self {
            server,
            engine,
            handler,
            wakeup_rx,
        }
    }

    /// Returns the shared engine.
    pub fn engine(&self) -> Arc<Mutex<CountdownTimer<S, A, N>>> {
        Arc::clone(&self.engine)
    }

    /// Runs until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("シグナルの待機に失敗しました: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs until `shutdown` completes.
    ///
    /// Requests are read on their own tasks, so a client that connects and
    /// never sends anything cannot hold up ticks or other clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        info!("Daemonを開始しました: {:?}", self.server.socket_path());

        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ReceivedRequest>();

        loop {
            // Queued wake-ups go first so a reply never shows a stale countdown
            tokio::select! {
                biased;

                Some(wakeup) = self.wakeup_rx.recv() => {
                    self.engine.lock().await.on_wakeup(wakeup).await;
                }
                Some((stream, request)) = request_rx.recv() => {
                    self.serve(stream, request).await;
                }
                accepted = self.server.accept() => {
                    let stream = accepted?;
                    let request_tx = request_tx.clone();
                    tokio::spawn(async move {
                        let mut stream = stream;
                        let request = IpcServer::receive_request(&mut stream).await;
                        let _ = request_tx.send((stream, request));
                    });
                }
                _ = &mut shutdown => {
                    info!("Daemonを終了します");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn serve(&self, mut stream: UnixStream, request: Result<IpcRequest>) {
        let response = match request {
            Ok(request) => {
                debug!("リクエストを受信しました: {:?}", request);
                self.handler.handle(request).await
            }
            Err(e) => {
                warn!("不正なリクエストを受信しました: {:#}", e);
                IpcResponse::error(format!("不正なリクエスト: {}", e))
            }
        };

        // A client that stops reading must not stall the loop either
        tokio::spawn(async move {
            if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
                warn!("レスポンスの送信に失敗しました: {:#}", e);
            }
        });
    }
}

// ============================================================================
// run_daemon
// ============================================================================

/// Builds the production daemon and runs it until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the paths cannot be resolved or the socket cannot be
/// bound.
pub async fn run_daemon(config: CountdownConfig, socket_path: &Path) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (wakeup_tx, wakeup_rx) = mpsc::unbounded_channel();

    let state_path = config
        .state_path()
        .context("状態ファイルのパスを決定できません")?;
    let store = FileTriggerStore::new(state_path);
    let alarm = SystemAlarm::new(Arc::clone(&clock), wakeup_tx.clone(), &config);
    let notifier = SystemNotifier::new_with_fallback().await;
    if !notifier.is_available() {
        warn!("デスクトップ通知は利用できません。終了はログにのみ記録されます");
    }

    let mut engine = CountdownTimer::new(
        clock,
        Box::new(TokioTicker::new(wakeup_tx)),
        store,
        alarm,
        notifier,
        TimerSettings::from(&config),
    );

    match engine.restore().await {
        RestoreOutcome::Fresh => {}
        RestoreOutcome::Resumed { remaining_millis } => {
            info!("前回のカウントダウンを再開します (残り {}ms)", remaining_millis);
        }
        RestoreOutcome::Elapsed => {
            info!("前回のカウントダウンは停止中に終了しました");
        }
    }

    let server = IpcServer::new(socket_path)?;
    Daemon::new(server, engine, wakeup_rx).run().await
}
