use thiserror::Error;

/// Failures reading or writing the shared document.
///
/// Only stores and the publisher surface these.  The poller swallows them:
/// a bad read just means "try again next tick".
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bridge I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bridge slot lock poisoned")]
    Poisoned,
}
