//! Sensor acquisition errors.

use thiserror::Error;

/// Failures that stop the sign-in pipeline before it starts.
///
/// All variants are fatal: the state machine moves to
/// [`AuthState::Fault`](crate::auth::AuthState::Fault) and stays there.
/// Retrying is left to whoever owns the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("model load failed: {model} — {message}")]
    ModelLoad { model: String, message: String },
}
