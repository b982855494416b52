//! IPC client for communicating with the countdown daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::{SetArgs, StartArgs};
use crate::config;
use crate::types::{IpcRequest, IpcResponse, StartParams};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
    /// Connection attempts before giving up
    max_retries: u32,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let socket_path = config::default_socket_path()?;
        Ok(Self::with_socket_path(socket_path))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Sets how many times a failed connection is attempted.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self, args: &StartArgs) -> Result<IpcResponse> {
        let params = StartParams {
            minutes: args.minutes.clone(),
            seconds: args.seconds.clone(),
        };
        self.send_request_with_retry(&IpcRequest::Start { params })
            .await
    }

    /// Sends a set command to the daemon.
    pub async fn set(&self, args: &SetArgs) -> Result<IpcResponse> {
        let request = IpcRequest::Set {
            minutes: args.minutes.clone(),
            seconds: args.seconds.clone(),
        };
        self.send_request_with_retry(&request).await
    }

    /// Sends a stop command to the daemon.
    pub async fn stop(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Stop).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Sends a request, retrying when the daemon cannot be reached.
    ///
    /// An error response from the daemon is returned as an error right away.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;

        let response = loop {
            match self.send_request(request).await {
                Ok(response) => break response,
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        "リクエスト失敗 (試行 {}/{}): {:#}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }

        Ok(response)
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'countdown daemon' を起動してください")?;

        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Half-close to mark the end of the request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseData;
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_mock_server() -> (tempfile::TempDir, PathBuf, UnixListener) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();
        (dir, path, listener)
    }

    /// Accepts one connection, returns the request it carried, and answers
    /// with `response`.
    async fn serve_once(listener: UnixListener, response: IpcResponse) -> IpcRequest {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await.unwrap();
        let request: IpcRequest = serde_json::from_slice(&buffer).unwrap();

        let json = serde_json::to_vec(&response).unwrap();
        stream.write_all(&json).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    }

    fn running_response() -> IpcResponse {
        IpcResponse::success(
            "カウントダウンを開始しました",
            Some(ResponseData {
                state: Some("running".to_string()),
                remaining_millis: Some(90_000),
                display: Some("01 : 30".to_string()),
                ..Default::default()
            }),
        )
    }

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path.as_path());
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let dir = tempfile::tempdir().unwrap();
            let client =
                IpcClient::with_socket_path(dir.path().join("missing.sock")).with_max_retries(1);

            let error = client.status().await.unwrap_err();
            assert!(format!("{:#}", error).contains("countdown daemon"));
        }

        #[tokio::test]
        async fn test_send_status_request() {
            let (_dir, path, listener) = create_mock_server();
            let server = tokio::spawn(serve_once(listener, running_response()));

            let client = IpcClient::with_socket_path(path);
            let response = client.status().await.unwrap();

            assert_eq!(
                response.data.unwrap().display.as_deref(),
                Some("01 : 30")
            );
            assert!(matches!(server.await.unwrap(), IpcRequest::Status));
        }

        #[tokio::test]
        async fn test_send_start_request() {
            let (_dir, path, listener) = create_mock_server();
            let server = tokio::spawn(serve_once(listener, running_response()));

            let client = IpcClient::with_socket_path(path);
            let args = StartArgs {
                minutes: Some("1".to_string()),
                seconds: Some("30".to_string()),
            };
            let response = client.start(&args).await.unwrap();
            assert_eq!(response.message, "カウントダウンを開始しました");

            match server.await.unwrap() {
                IpcRequest::Start { params } => {
                    assert_eq!(params.minutes.as_deref(), Some("1"));
                    assert_eq!(params.seconds.as_deref(), Some("30"));
                }
                _ => panic!("Expected Start request"),
            }
        }

        #[tokio::test]
        async fn test_send_set_request() {
            let (_dir, path, listener) = create_mock_server();
            let server = tokio::spawn(serve_once(
                listener,
                IpcResponse::success("時間を設定しました", None),
            ));

            let client = IpcClient::with_socket_path(path);
            let args = SetArgs {
                minutes: "3".to_string(),
                seconds: "0".to_string(),
            };
            client.set(&args).await.unwrap();

            assert!(matches!(
                server.await.unwrap(),
                IpcRequest::Set { minutes, .. } if minutes == "3"
            ));
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let (_dir, path, listener) = create_mock_server();
            let server = tokio::spawn(serve_once(
                listener,
                IpcResponse::error("タイマーは実行されていません"),
            ));

            let client = IpcClient::with_socket_path(path);
            let error = client.stop().await.unwrap_err();

            assert!(error.to_string().contains("実行されていません"));
            assert!(matches!(server.await.unwrap(), IpcRequest::Stop));
        }
    }
}
