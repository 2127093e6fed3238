//! Engine-side visual state and its mapping from the session status.

use bridge_doc::SessionStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisualState {
    /// Scattered static while the sensors come up.
    #[default]
    Boot,
    /// Converging face mask while sign-in is pending.
    AuthFace,
    /// The active shape, breathing with the voice.
    Idle,
    /// Particles stream toward the hand.
    Action,
}

impl VisualState {
    /// Total mapping; anything unrecognised is `Boot`.
    pub fn from_status(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Initializing => VisualState::Boot,
            SessionStatus::AuthPending  => VisualState::AuthFace,
            SessionStatus::Online       => VisualState::Idle,
            SessionStatus::Listening    => VisualState::Action,
            SessionStatus::Unknown      => VisualState::Boot,
        }
    }

    /// Parse a state name; unknown names fall back to `Boot`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "AUTH_FACE" => VisualState::AuthFace,
            "IDLE"      => VisualState::Idle,
            "ACTION"    => VisualState::Action,
            _           => VisualState::Boot,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualState::Boot     => "BOOT",
            VisualState::AuthFace => "AUTH_FACE",
            VisualState::Idle     => "IDLE",
            VisualState::Action   => "ACTION",
        }
    }
}
