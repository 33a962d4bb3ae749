use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::ipc::protocol::{self, BUFFER_SIZE, Request, Response};

/// Sends `request` to the daemon at `socket_path` and waits for its single response.
pub async fn send_request(socket_path: &Path, request: &Request) -> Result<Response> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
                anyhow!("Daemon not running (no socket at {})", socket_path.display())
            }
            io::ErrorKind::PermissionDenied => {
                anyhow!("Permission denied - check permissions of {}", socket_path.display())
            }
            _ => anyhow::Error::new(e).context("Failed to connect to daemon"),
        })?;

    let bytes = protocol::encode(request).context("Failed to encode request")?;
    stream
        .write_all(&bytes)
        .await
        .context("Failed to send request")?;
    stream.shutdown().await.context("Failed to send request")?;

    let mut buf = Vec::with_capacity(BUFFER_SIZE);
    stream
        .read_to_end(&mut buf)
        .await
        .context("Failed to read response")?;
    if buf.is_empty() {
        anyhow::bail!("Daemon closed the connection without a response");
    }

    protocol::decode_response(&buf).context("Daemon sent an invalid response")
}
