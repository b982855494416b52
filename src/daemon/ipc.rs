//! IPC server for the countdown daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - One JSON request per connection, terminated by the client half-closing
//! - Dispatch of set/start/stop/status to the [`CountdownTimer`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::alarm::AlarmScheduler;
use crate::notification::Notifier;
use crate::store::TriggerStore;
use crate::types::{IpcRequest, IpcResponse, ResponseData, StartParams};

use super::timer::CountdownTimer;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// The client closed the connection without sending anything
    #[error("Connection closed by client")]
    EmptyRequest,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        // Stale socket from a previous daemon
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request, up to the client's half-close.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, on an empty or oversized request, or if
    /// the payload is not a valid request.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(512);
        let limit = (MAX_REQUEST_SIZE + 1) as u64;

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            (&mut *stream).take(limit).read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            return Err(IpcError::EmptyRequest.into());
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;
        stream
            .shutdown()
            .await
            .context("Failed to shut down stream")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the countdown engine.
pub struct RequestHandler<S, A, N> {
    /// Shared reference to the engine
    engine: Arc<Mutex<CountdownTimer<S, A, N>>>,
}

impl<S, A, N> RequestHandler<S, A, N>
where
    S: TriggerStore,
    A: AlarmScheduler,
    N: Notifier,
{
    /// Creates a new request handler for the given engine.
    pub fn new(engine: Arc<Mutex<CountdownTimer<S, A, N>>>) -> Self {
        Self { engine }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start { params } => self.handle_start(params).await,
            IpcRequest::Set { minutes, seconds } => self.handle_set(&minutes, &seconds).await,
            IpcRequest::Stop => self.handle_stop().await,
            IpcRequest::Status => self.handle_status().await,
        }
    }

    /// Handles the start command.
    ///
    /// With a duration the selection is replaced first; without one the
    /// current selection is started.
    async fn handle_start(&self, params: StartParams) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        if !params.is_empty() {
            let minutes = params.minutes.as_deref().unwrap_or("0");
            let seconds = params.seconds.as_deref().unwrap_or("0");
            if let Err(e) = engine.apply_input(minutes, seconds) {
                return IpcResponse::error(e.to_string());
            }
        }

        match engine.start().await {
            Ok(_) => IpcResponse::success(
                "カウントダウンを開始しました",
                Some(ResponseData::from_snapshot(&engine.snapshot())),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the set command.
    async fn handle_set(&self, minutes: &str, seconds: &str) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        match engine.apply_input(minutes, seconds) {
            Ok(_) => IpcResponse::success(
                "時間を設定しました",
                Some(ResponseData::from_snapshot(&engine.snapshot())),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the stop command.
    async fn handle_stop(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        match engine.stop().await {
            Ok(()) => IpcResponse::success(
                "カウントダウンを停止しました",
                Some(ResponseData::from_snapshot(&engine.snapshot())),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Handles the status command.
    async fn handle_status(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        IpcResponse::success("", Some(ResponseData::from_snapshot(&engine.snapshot())))
    }
}

// ============================================================================
// Tests
// ============================================================================
