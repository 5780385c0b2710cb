use thiserror::Error;

use crate::core::env::ConfigError;

/// Error taxonomy for the client.
///
/// Configuration and validation errors are caller logic errors and are not
/// retryable. `Transport` means no response was received; `Remote` carries
/// the status and body of a non-2xx response. The client never retries on
/// its own.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid order parameters: {reason}")]
    InvalidOrderParameters { reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error (status {status}): {body}")]
    Remote { status: u16, body: String },

    #[error("stream session is not open")]
    SessionNotOpen,

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub(crate) fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidOrderParameters {
            reason: reason.into(),
        }
    }
}
