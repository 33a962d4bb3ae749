use std::future::Future;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::bluetooth::{discovery::InquiryRunner, service::ServiceReloader};
use crate::ipc::dispatcher::Dispatcher;
use crate::ipc::protocol::{self, BUFFER_SIZE, Response};

/// Pause after a failed `accept`, so a persistent error such as EMFILE does not spin.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct IpcServer {
    listener: UnixListener,
    /// Removed again when the server is dropped.
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the socket at `socket_path` and applies `mode` to it.
    ///
    /// A leftover socket file from an earlier run is removed first.
    pub fn bind(socket_path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = socket_path.as_ref().to_path_buf();

        if path.exists() {
            warn!("Removing existing socket: {}", path.display());
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale socket: {}", path.display()))?;
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("Failed to bind IPC socket: {}", path.display()))?;
        info!("Socket bound to {}", path.display());

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        info!("Socket permissions set to {:o}", mode);

        Ok(Self {
            listener,
            socket_path: path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serves connections one at a time until `shutdown` completes.
    ///
    /// Nothing a single connection does can end the loop: errors and panics are logged at the
    /// connection boundary and the next connection is accepted.
    pub async fn serve<I, R>(
        &self,
        dispatcher: &Dispatcher<I, R>,
        shutdown: impl Future<Output = ()>,
    ) where
        I: InquiryRunner,
        R: ServiceReloader,
    {
        tokio::pin!(shutdown);
        info!("Daemon listening for connections...");

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down IPC server");
                    break;
                }
                accepted = self.listener.accept() => accepted,
            };
            let stream = match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    backoff_after_accept_error(&e).await;
                    continue;
                }
            };
            debug!("Client connected");

            match AssertUnwindSafe(handle_connection(stream, dispatcher))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Error handling client: {:#}", e),
                Err(_) => error!("Panic while handling client; connection dropped"),
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            match std::fs::remove_file(&self.socket_path) {
                Ok(()) => info!("Cleaned up socket {}", self.socket_path.display()),
                Err(e) => warn!(
                    "Could not remove socket {}: {}",
                    self.socket_path.display(),
                    e
                ),
            }
        }
    }
}

async fn backoff_after_accept_error(e: &io::Error) {
    warn!("IPC accept error: {}; retrying in {:?}", e, ACCEPT_RETRY_DELAY);
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

/// Reads one request, answers it, and closes the stream.
///
/// A peer that closes without sending anything gets no response. Undecodable bytes are answered
/// with an "invalid format" error without reaching the dispatcher.
pub async fn handle_connection<I, R>(
    mut stream: UnixStream,
    dispatcher: &Dispatcher<I, R>,
) -> Result<()>
where
    I: InquiryRunner,
    R: ServiceReloader,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let n = stream.read(&mut buf).await.context("Failed to read request")?;
    if n == 0 {
        warn!("Empty request received");
        return Ok(());
    }

    let response = match protocol::decode_request(&buf[..n]) {
        Ok(request) => {
            debug!(?request, "Received request");
            dispatcher.dispatch(request).await
        }
        Err(e) => {
            warn!("Invalid request: {}", e);
            Response::invalid_format()
        }
    };

    let bytes = protocol::encode(&response).context("Failed to encode response")?;
    stream
        .write_all(&bytes)
        .await
        .context("Failed to send response")?;
    stream.shutdown().await.context("Failed to close connection")?;

    info!(status = ?response.status, "Sent response");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn accept_error_pauses_before_retry() {
        let started = Instant::now();
        backoff_after_accept_error(&io::Error::from_raw_os_error(24)).await;
        assert!(started.elapsed() >= ACCEPT_RETRY_DELAY);
    }
}
