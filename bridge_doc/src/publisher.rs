//! Producer side: merge partial updates into the snapshot and write it out.

use tracing::{trace, warn};

use crate::error::BridgeError;
use crate::snapshot::{BridgeSnapshot, HandPos, SessionStatus};
use crate::store::BridgeStore;

/// A partial update.  `None` fields keep their previous value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BridgePatch {
    pub status: Option<SessionStatus>,
    /// `Some(None)` clears the hand.
    pub hand_pos: Option<Option<HandPos>>,
    pub active_gesture: Option<String>,
    pub voice_amplitude: Option<f32>,
    pub auth_type: Option<String>,
}

impl BridgePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, s: SessionStatus) -> Self {
        self.status = Some(s);
        self
    }

    pub fn hand_pos(mut self, p: HandPos) -> Self {
        self.hand_pos = Some(Some(p));
        self
    }

    pub fn no_hand(mut self) -> Self {
        self.hand_pos = Some(None);
        self
    }

    pub fn active_gesture(mut self, g: impl Into<String>) -> Self {
        self.active_gesture = Some(g.into());
        self
    }

    pub fn voice_amplitude(mut self, a: f32) -> Self {
        self.voice_amplitude = Some(a);
        self
    }

    pub fn auth_type(mut self, t: impl Into<String>) -> Self {
        self.auth_type = Some(t.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == BridgePatch::default()
    }
}

pub struct BridgePublisher<S: BridgeStore> {
    store: S,
    current: BridgeSnapshot,
    failures: u64,
}

impl<S: BridgeStore> BridgePublisher<S> {
    pub fn new(store: S) -> Self {
        BridgePublisher { store, current: BridgeSnapshot::default(), failures: 0 }
    }

    pub fn snapshot(&self) -> &BridgeSnapshot {
        &self.current
    }

    /// Write failures so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Merge `patch` and write the whole snapshot.
    ///
    /// The in-memory snapshot is updated even when the write fails, so the
    /// next successful write carries everything.
    pub fn publish(&mut self, patch: BridgePatch) -> Result<&BridgeSnapshot, BridgeError> {
        let BridgePatch { status, hand_pos, active_gesture, voice_amplitude, auth_type } = patch;
        if let Some(s) = status          { self.current.status = s; }
        if let Some(p) = hand_pos        { self.current.hand_pos = p; }
        if let Some(g) = active_gesture  { self.current.active_gesture = g; }
        if let Some(a) = voice_amplitude { self.current.voice_amplitude = a; }
        if let Some(t) = auth_type       { self.current.auth_type = t; }

        self.current.version += 1;
        self.current.sanitize();

        let written = self.current.to_json().and_then(|body| self.store.write(&body));
        match written {
            Ok(()) => {
                trace!(version = self.current.version, status = self.current.status.as_str(), "bridge written");
                Ok(&self.current)
            }
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, version = self.current.version, "bridge write failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BridgeDocument;
    use crate::store::MemoryBridge;

    #[test]
    fn patches_merge_and_version_increments() {
        let mem = MemoryBridge::new();
        let mut p = BridgePublisher::new(mem.clone());
        p.publish(BridgePatch::new().status(SessionStatus::AuthPending)).unwrap();
        p.publish(BridgePatch::new().auth_type("PENDING_FIST_OVERRIDE")).unwrap();

        let doc = BridgeDocument::parse(&mem.read().unwrap().unwrap()).unwrap();
        assert_eq!(doc.status, Some(SessionStatus::AuthPending));
        assert_eq!(doc.auth_type.as_deref(), Some("PENDING_FIST_OVERRIDE"));
        assert_eq!(doc.version, Some(2));
    }

    #[test]
    fn written_telemetry_is_well_formed() {
        let mem = MemoryBridge::new();
        let mut p = BridgePublisher::new(mem);
        let snap = p
            .publish(BridgePatch::new().hand_pos(HandPos::new(f32::INFINITY, 0.0, 0.0)).voice_amplitude(-1.0))
            .unwrap();
        assert_eq!(snap.hand_pos, None);
        assert_eq!(snap.voice_amplitude, 0.0);
    }

    #[test]
    fn lost_hand_is_written_as_null() {
        let mem = MemoryBridge::new();
        let mut p = BridgePublisher::new(mem.clone());
        p.publish(BridgePatch::new().hand_pos(HandPos::new(0.9, 0.35, 0.0))).unwrap();
        p.publish(BridgePatch::new().status(SessionStatus::Online)).unwrap();
        assert_eq!(p.snapshot().hand_pos, Some(HandPos::new(0.9, 0.35, 0.0)));

        p.publish(BridgePatch::new().no_hand()).unwrap();
        let body = mem.read().unwrap().unwrap();
        assert!(body.contains("\"hand_pos\":null"));
        assert_eq!(BridgeDocument::parse(&body).unwrap().hand(), None);
    }

    struct Broken;
    impl BridgeStore for Broken {
        fn write(&self, _: &str) -> Result<(), BridgeError> {
            Err(BridgeError::Poisoned)
        }
        fn read(&self) -> Result<Option<String>, BridgeError> {
            Err(BridgeError::Poisoned)
        }
    }

    #[test]
    fn failed_write_keeps_state() {
        let mut p = BridgePublisher::new(Broken);
        assert!(p.publish(BridgePatch::new().status(SessionStatus::Online)).is_err());
        assert_eq!(p.failures(), 1);
        assert_eq!(p.snapshot().status, SessionStatus::Online);
    }
}
