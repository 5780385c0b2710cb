use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::errors::ClientError;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> Result<u64, ClientError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| ClientError::Transport(format!("failed to read system clock: {}", e)))
}
