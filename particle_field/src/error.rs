use thiserror::Error;

/// Audio capture failures.  None of these are fatal: the field just stops
/// reacting to sound.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio input device available")]
    NoInputDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("microphone capture not built in (enable the `mic` feature)")]
    Disabled,
}
