//! Control socket for the bell daemon.
//!
//! A Unix domain socket next to the user's other runtime files:
//! - One JSON request and one JSON response per connection
//! - `ring` hands a bell to the bell loop, `status` reports the counters

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossbeam_channel::Sender;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::types::{IpcRequest, IpcResponse, ResponseData};

use super::bell::{notify, Bell, BellStats, Notify};

// ============================================================================
// Constants
// ============================================================================

/// Socket file name inside the runtime directory
pub const SOCKET_NAME: &str = "belld.sock";

/// Fallback directory under the home directory
const HOME_SOCKET_DIR: &str = ".belld";

/// Requests are tiny; anything larger is rejected.
const MAX_REQUEST_SIZE: usize = 4096;

const READ_TIMEOUT_SECS: u64 = 5;

/// Returns the default control socket path.
///
/// `$XDG_RUNTIME_DIR/belld.sock` when a runtime directory exists,
/// otherwise `~/.belld/belld.sock`.
///
/// # Errors
///
/// Returns an error if neither directory can be determined.
pub fn default_socket_path() -> Result<PathBuf> {
    if let Some(runtime) = dirs::runtime_dir() {
        return Ok(runtime.join(SOCKET_NAME));
    }
    let home = dirs::home_dir().context("Cannot determine the home directory")?;
    Ok(home.join(HOME_SOCKET_DIR).join(SOCKET_NAME))
}

// ============================================================================
// IpcError
// ============================================================================

/// Failures while reading a control request.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Cannot read the request: {0}")]
    ReadError(String),

    /// The client sent nothing within the read timeout
    #[error("Timed out waiting for the request")]
    Timeout,

    #[error("Request exceeds {MAX_REQUEST_SIZE} bytes")]
    RequestTooLarge,

    /// Connection closed before a request arrived
    #[error("Connection closed by client")]
    Closed,
}

// ============================================================================
// IpcServer
// ============================================================================

/// The daemon's end of the control socket.
///
/// The socket file is removed again when the server is dropped.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the control socket at `socket_path`.
    ///
    /// A leftover socket file from a daemon that is no longer running is
    /// replaced; a socket some other daemon still answers on is not.
    ///
    /// # Errors
    ///
    /// Returns an error if another daemon owns the socket, the directory
    /// cannot be created or the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
                bail!(
                    "Another belld daemon is already listening on {}",
                    socket_path.display()
                );
            }
            debug!("Removing stale socket {}", socket_path.display());
            std::fs::remove_file(socket_path).with_context(|| {
                format!("Cannot remove the stale socket {}", socket_path.display())
            })?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Cannot listen on {}", socket_path.display()))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Waits for the next client.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _) = self
            .listener
            .accept()
            .await
            .context("Cannot accept a control connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if reading times out or fails, the request is too
    /// large, or it is not valid JSON.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(256);
        let mut chunk = [0u8; 512];

        loop {
            let n = match timeout(Duration::from_secs(READ_TIMEOUT_SECS), stream.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
                Err(_) => return Err(IpcError::Timeout.into()),
            };
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if buffer.len() > MAX_REQUEST_SIZE {
                return Err(IpcError::RequestTooLarge.into());
            }
            // A complete JSON value is a complete request.
            if serde_json::from_slice::<serde_json::Value>(&buffer).is_ok() {
                break;
            }
        }

        if buffer.is_empty() {
            return Err(IpcError::Closed.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Malformed control request")?;
        Ok(request)
    }

    /// Writes `response` as one JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Cannot encode the response")?;
        stream
            .write_all(&json)
            .await
            .context("Cannot send the response")?;
        stream.flush().await.context("Cannot send the response")
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Reads one request from `stream`, answers it and closes the connection.
///
/// # Errors
///
/// Returns an error if the request cannot be read or the response cannot be
/// written. Malformed requests get an error response first.
pub async fn serve_connection(mut stream: UnixStream, handler: Arc<RequestHandler>) -> Result<()> {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => handler.handle(request),
        Err(e) => {
            let response = IpcResponse::error(e.to_string());
            // Best effort; the client may already be gone.
            let _ = IpcServer::send_response(&mut stream, &response).await;
            return Err(e);
        }
    };
    IpcServer::send_response(&mut stream, &response).await
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Answers IPC requests on behalf of the bell loop.
pub struct RequestHandler {
    /// Sender side of the bell channel
    bell_tx: Sender<Bell>,
    /// Counters shared with the bell loop
    stats: Arc<BellStats>,
    /// Description of the configured beep
    mode: String,
    /// Throttle interval in milliseconds
    throttle_ms: u64,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(
        bell_tx: Sender<Bell>,
        stats: Arc<BellStats>,
        mode: impl Into<String>,
        throttle_ms: u64,
    ) -> Self {
        Self {
            bell_tx,
            stats,
            mode: mode.into(),
            throttle_ms,
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub fn handle(&self, request: IpcRequest) -> IpcResponse {
        debug!("Handling {:?} request", request);
        match request {
            IpcRequest::Ring => self.handle_ring(),
            IpcRequest::Status => self.handle_status(),
        }
    }

    /// Handles the ring command.
    fn handle_ring(&self) -> IpcResponse {
        match notify(&self.bell_tx, &self.stats) {
            Notify::Queued => IpcResponse::success(
                "Bell queued",
                Some(ResponseData {
                    coalesced: Some(false),
                    ..ResponseData::default()
                }),
            ),
            Notify::Coalesced => IpcResponse::success(
                "Bell merged into the pending one",
                Some(ResponseData {
                    coalesced: Some(true),
                    ..ResponseData::default()
                }),
            ),
            Notify::Closed => IpcResponse::error("The bell loop is not running"),
        }
    }

    /// Handles the status command.
    fn handle_status(&self) -> IpcResponse {
        let snapshot = self.stats.snapshot();
        IpcResponse::success(
            "",
            Some(ResponseData {
                mode: Some(self.mode.clone()),
                throttle_ms: Some(self.throttle_ms),
                rings: Some(snapshot.rings),
                beeps: Some(snapshot.beeps),
                failures: Some(snapshot.failures),
                coalesced: None,
            }),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
