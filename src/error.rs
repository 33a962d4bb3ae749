use std::time::Duration;

use thiserror::Error as ThisError;

/// Failure modes of a device inquiry run.
///
/// The `Display` text is what a client sees in the `message` of a failed scan.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
    #[error("{command} not found")]
    NotFound { command: String },

    #[error("scan timeout after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("failed to scan devices ({status})")]
    Failed { status: String, stderr: String },

    #[error("failed to run {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a request payload could not be decoded.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("request is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request is not a JSON object")]
    NotAnObject,
}
