//! The bridge document.
//!
//! ```json
//! { "status": "ONLINE",
//!   "hand_pos": { "x": 0.42, "y": 0.61, "z": -0.03 },
//!   "active_gesture": "PALM",
//!   "voice_amplitude": 0.12,
//!   "auth_type": "FACE",
//!   "version": 318 }
//! ```
//!
//! `hand_pos` is `null` while no hand is tracked.
//!
//! The producer always writes a complete [`BridgeSnapshot`].  The consumer
//! reads a [`BridgeDocument`], where every field is optional, because it may
//! see a document written by an older producer or one caught mid-update.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

// ════════════════════════════════════════════════════════════════════════════
// SessionStatus
// ════════════════════════════════════════════════════════════════════════════

/// Session-level status as carried on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Initializing,
    AuthPending,
    Online,
    Listening,
    /// Anything else a producer might send.  Consumers treat it as boot.
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "INITIALIZING",
            SessionStatus::AuthPending  => "AUTH_PENDING",
            SessionStatus::Online       => "ONLINE",
            SessionStatus::Listening    => "LISTENING",
            SessionStatus::Unknown      => "UNKNOWN",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandPos
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HandPos {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        HandPos { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BridgeSnapshot — producer side
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    pub status: SessionStatus,
    /// `None` while no hand is tracked.
    pub hand_pos: Option<HandPos>,
    pub active_gesture: String,
    /// Normalised to `[0, 1]`.
    pub voice_amplitude: f32,
    pub auth_type: String,
    /// Incremented on every write.
    pub version: u64,
}

impl Default for BridgeSnapshot {
    fn default() -> Self {
        BridgeSnapshot {
            status: SessionStatus::Initializing,
            hand_pos: None,
            active_gesture: "NONE".to_string(),
            voice_amplitude: 0.0,
            auth_type: "NONE".to_string(),
            version: 0,
        }
    }
}

impl BridgeSnapshot {
    /// Replace anything that would not survive a round trip as telemetry:
    /// non-finite coordinates drop the hand, amplitude is clamped, and an
    /// `Unknown` status is never written.
    pub fn sanitize(&mut self) {
        if self.hand_pos.is_some_and(|h| !h.is_finite()) {
            self.hand_pos = None;
        }
        self.voice_amplitude = if self.voice_amplitude.is_finite() {
            self.voice_amplitude.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.status == SessionStatus::Unknown {
            self.status = SessionStatus::Initializing;
        }
    }

    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BridgeDocument — consumer side
// ════════════════════════════════════════════════════════════════════════════

/// Lenient view of whatever the consumer found.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeDocument {
    pub status: Option<SessionStatus>,
    pub hand_pos: Option<HandPos>,
    pub active_gesture: Option<String>,
    pub voice_amplitude: Option<f32>,
    pub auth_type: Option<String>,
    pub version: Option<u64>,
}

impl BridgeDocument {
    pub fn parse(body: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Hand position, if present and finite.
    pub fn hand(&self) -> Option<HandPos> {
        self.hand_pos.filter(HandPos::is_finite)
    }

    /// Amplitude, if present, clamped to `[0, 1]`.
    pub fn amplitude(&self) -> Option<f32> {
        self.voice_amplitude
            .filter(|a| a.is_finite())
            .map(|a| a.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        let snap = BridgeSnapshot { status: SessionStatus::AuthPending, ..Default::default() };
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"status\":\"AUTH_PENDING\""));
        assert!(json.contains("\"hand_pos\":null"));
        assert!(json.contains("\"active_gesture\":\"NONE\""));
    }

    #[test]
    fn unknown_status_parses_as_unknown() {
        let doc = BridgeDocument::parse(r#"{"status":"REBOOTING"}"#).unwrap();
        assert_eq!(doc.status, Some(SessionStatus::Unknown));
    }

    #[test]
    fn partial_document_is_accepted() {
        let doc = BridgeDocument::parse(r#"{"hand_pos":{"x":0.5}}"#).unwrap();
        assert_eq!(doc.status, None);
        assert_eq!(doc.hand(), Some(HandPos::new(0.5, 0.0, 0.0)));
        assert_eq!(doc.amplitude(), None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(BridgeDocument::parse("{\"status\": ").is_err());
        assert!(BridgeDocument::parse(r#"{"status": 7}"#).is_err());
    }

    #[test]
    fn sanitize_clamps_and_drops_bad_hand() {
        let mut snap = BridgeSnapshot {
            hand_pos: Some(HandPos::new(f32::NAN, 0.0, 0.0)),
            voice_amplitude: 3.5,
            status: SessionStatus::Unknown,
            ..Default::default()
        };
        snap.sanitize();
        assert_eq!(snap.hand_pos, None);
        assert_eq!(snap.voice_amplitude, 1.0);
        assert_eq!(snap.status, SessionStatus::Initializing);
    }
}
