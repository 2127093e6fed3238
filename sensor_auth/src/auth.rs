//! The sign-in state machine.
//!
//! ```text
//!  Initializing ──ready──▶ FaceWait ──face timeout──▶ VoiceWait ──voice timeout──▶ PasswordWait
//!       │                     │                          │                              │
//!       └──────── any qualifying signal ─────────────────┴──────────────────────────────┴──▶ Online
//! ```
//!
//! * Face (or the biometric proximity shortcut) authenticates from
//!   `FaceWait`; whether it still counts once the fist prompt is showing is
//!   decided by [`FacePolicy`].
//! * The face timeout shows the fist-override prompt and enables the voice
//!   recogniser in the same step.
//! * A fist authenticates whenever the prompt is visible.
//! * A wake phrase authenticates once the recogniser is enabled.
//! * The typed secret authenticates from any waiting state.
//! * `Online` is terminal; further signals are no-ops.
//! * `Fault` (camera/model failure) is terminal too and ignores everything.
//!
//! All time comes in through `now` arguments, so the machine is fully
//! deterministic under test.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::SensorError;
use crate::events::CoreEvent;
use crate::gesture::GestureClass;
use crate::keys::{OverrideBuffer, DEFAULT_KEY_BUFFER};
use crate::sensor::Signal;

// ════════════════════════════════════════════════════════════════════════════
// States & methods
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthState {
    #[default]
    Initializing,
    FaceWait,
    VoiceWait,
    PasswordWait,
    Online,
    Fault,
}

impl AuthState {
    pub fn is_waiting(&self) -> bool {
        matches!(self, AuthState::FaceWait | AuthState::VoiceWait | AuthState::PasswordWait)
    }

    /// Human-readable line for the status display.
    pub fn status_text(&self) -> &'static str {
        match self {
            AuthState::Initializing => "[BOOTING VISION ENGINE...]",
            AuthState::FaceWait     => "[SENSORS ACTIVE]",
            AuthState::VoiceWait    => "[VOICE SYNC ACTIVE]",
            AuthState::PasswordWait => "[MANUAL OVERRIDE READY]",
            AuthState::Online       => "[ONLINE]",
            AuthState::Fault        => "[HARDWARE ERROR]",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    Face,
    Fist,
    Voice,
    Override,
    Biometric,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Face      => "FACE",
            AuthMethod::Fist      => "FIST",
            AuthMethod::Voice     => "VOICE",
            AuthMethod::Override  => "OVERRIDE",
            AuthMethod::Biometric => "BIOMETRIC",
        }
    }
}

/// Does a face still authenticate after the fist prompt has appeared?
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacePolicy {
    /// Face only counts while the prompt is hidden.
    #[default]
    BeforePromptOnly,
    /// Face counts in every waiting state.
    Always,
}

// ════════════════════════════════════════════════════════════════════════════
// AuthConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Face window, measured from the moment the sensors come up.
    pub face_timeout_ms: u64,
    /// Voice window, measured from session start.
    pub voice_timeout_ms: u64,
    /// Any transcript containing one of these authenticates.
    pub wake_phrases: Vec<String>,
    pub override_secret: String,
    pub key_buffer: usize,
    pub face_policy: FacePolicy,
    /// Wrist depth for the hand-proximity biometric shortcut; `None` disables it.
    pub biometric_depth: Option<f32>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            face_timeout_ms:  5_000,
            voice_timeout_ms: 20_000,
            wake_phrases:     vec!["zeno".to_string(), "hello".to_string()],
            override_secret:  "jarvis".to_string(),
            key_buffer:       DEFAULT_KEY_BUFFER,
            face_policy:      FacePolicy::BeforePromptOnly,
            biometric_depth:  Some(-0.1),
        }
    }
}

impl AuthConfig {
    pub fn face_timeout(&self) -> Duration {
        Duration::from_millis(self.face_timeout_ms)
    }

    pub fn voice_timeout(&self) -> Duration {
        Duration::from_millis(self.voice_timeout_ms)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AuthSession
// ════════════════════════════════════════════════════════════════════════════

/// Authoritative session record.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSession {
    pub state: AuthState,
    pub started_at: Instant,
    pub authenticated_via: Option<AuthMethod>,
    /// The fist-override prompt is on screen.
    pub prompt_visible: bool,
    /// The speech recogniser has been switched on.
    pub voice_enabled: bool,
    pub fault: Option<SensorError>,
}

// ════════════════════════════════════════════════════════════════════════════
// AuthStateMachine
// ════════════════════════════════════════════════════════════════════════════

pub struct AuthStateMachine {
    cfg: AuthConfig,
    session: AuthSession,
    keys: OverrideBuffer,
    face_deadline: Option<Instant>,
    voice_deadline: Instant,
}

impl AuthStateMachine {
    pub fn new(cfg: AuthConfig, now: Instant) -> Self {
        let keys = OverrideBuffer::new(&cfg.override_secret, cfg.key_buffer);
        let voice_deadline = now + cfg.voice_timeout();
        AuthStateMachine {
            session: AuthSession {
                state: AuthState::Initializing,
                started_at: now,
                authenticated_via: None,
                prompt_visible: false,
                voice_enabled: false,
                fault: None,
            },
            cfg,
            keys,
            face_deadline: None,
            voice_deadline,
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn state(&self) -> AuthState {
        self.session.state
    }

    pub fn is_online(&self) -> bool {
        self.session.state == AuthState::Online
    }

    pub fn config(&self) -> &AuthConfig {
        &self.cfg
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Camera and models are up: start the face window.
    pub fn sensors_ready(&mut self, now: Instant) -> Vec<CoreEvent> {
        let mut out = Vec::new();
        if self.session.state == AuthState::Initializing {
            self.face_deadline = Some(now + self.cfg.face_timeout());
            self.enter(AuthState::FaceWait, &mut out);
        }
        out
    }

    /// Sensor acquisition or model load failed.  Terminal.
    pub fn sensors_failed(&mut self, err: SensorError) -> Vec<CoreEvent> {
        let mut out = Vec::new();
        if matches!(self.session.state, AuthState::Online | AuthState::Fault) {
            return out;
        }
        error!(error = %err, "sensor acquisition failed; sign-in disabled");
        self.session.fault = Some(err);
        self.session.prompt_visible = false;
        self.face_deadline = None;
        self.enter(AuthState::Fault, &mut out);
        out
    }

    // ── timers ────────────────────────────────────────────────────────────

    /// Fire any elapsed fallback deadlines.
    pub fn tick(&mut self, now: Instant) -> Vec<CoreEvent> {
        let mut out = Vec::new();

        if self.session.state == AuthState::FaceWait {
            if let Some(deadline) = self.face_deadline {
                if now >= deadline {
                    self.face_deadline = None;
                    self.session.prompt_visible = true;
                    self.session.voice_enabled = true;
                    info!("face window elapsed; fist override prompt shown");
                    self.enter(AuthState::VoiceWait, &mut out);
                }
            }
        }

        if self.session.state == AuthState::VoiceWait && now >= self.voice_deadline {
            self.enter(AuthState::PasswordWait, &mut out);
        }

        out
    }

    /// Time left before the next fallback step, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.session.state {
            AuthState::FaceWait  => self.face_deadline,
            AuthState::VoiceWait => Some(self.voice_deadline),
            _ => None,
        }
    }

    // ── signals ───────────────────────────────────────────────────────────

    /// Process one normalised signal.  Deadlines are checked first so a late
    /// frame sees the state it would have seen had the timer fired on time.
    pub fn handle(&mut self, signal: &Signal, now: Instant) -> Vec<CoreEvent> {
        let mut out = self.tick(now);

        match self.session.state {
            AuthState::Online | AuthState::Fault => return out,
            _ => {}
        }

        let method = match signal {
            Signal::FaceDetected { biometric } if self.face_allowed() => {
                Some(if *biometric { AuthMethod::Biometric } else { AuthMethod::Face })
            }
            Signal::GestureClass(GestureClass::Fist) if self.session.prompt_visible => {
                Some(AuthMethod::Fist)
            }
            Signal::VoicePhraseHeard(text) if self.session.voice_enabled => {
                let text = text.to_lowercase();
                self.cfg
                    .wake_phrases
                    .iter()
                    .any(|p| !p.is_empty() && text.contains(&p.to_lowercase()))
                    .then_some(AuthMethod::Voice)
            }
            Signal::Key(c) => self.keys.push(*c).then_some(AuthMethod::Override),
            _ => None,
        };

        if let Some(m) = method {
            self.succeed(m, &mut out);
        }
        out
    }

    pub fn handle_all<'a, I>(&mut self, signals: I, now: Instant) -> Vec<CoreEvent>
    where
        I: IntoIterator<Item = &'a Signal>,
    {
        let mut out = Vec::new();
        for s in signals {
            out.extend(self.handle(s, now));
        }
        out
    }

    fn face_allowed(&self) -> bool {
        match self.cfg.face_policy {
            FacePolicy::BeforePromptOnly => {
                self.session.state == AuthState::FaceWait && !self.session.prompt_visible
            }
            FacePolicy::Always => self.session.state.is_waiting(),
        }
    }

    fn succeed(&mut self, method: AuthMethod, out: &mut Vec<CoreEvent>) {
        self.session.authenticated_via = Some(method);
        self.session.prompt_visible = false;
        self.face_deadline = None;
        self.keys.clear();
        self.enter(AuthState::Online, out);
        info!(method = method.as_str(), "authenticated");
        out.push(CoreEvent::AuthSuccess { method });
    }

    fn enter(&mut self, state: AuthState, out: &mut Vec<CoreEvent>) {
        let from = self.session.state;
        if from == state {
            return;
        }
        self.session.state = state;
        info!(from = ?from, to = ?state, "auth state changed");
        out.push(CoreEvent::StateChanged { new_state: state });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const S: Duration = Duration::from_secs(1);

    fn ready_machine(cfg: AuthConfig) -> (AuthStateMachine, Instant) {
        let t0 = Instant::now();
        let mut m = AuthStateMachine::new(cfg, t0);
        m.sensors_ready(t0);
        (m, t0)
    }

    fn face() -> Signal {
        Signal::FaceDetected { biometric: false }
    }

    #[test]
    fn starts_initializing_and_ignores_face_until_ready() {
        let t0 = Instant::now();
        let mut m = AuthStateMachine::new(AuthConfig::default(), t0);
        assert_eq!(m.state(), AuthState::Initializing);
        assert!(m.handle(&face(), t0).is_empty());
        assert_eq!(m.state(), AuthState::Initializing);
    }

    #[test]
    fn face_authenticates_in_face_wait() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        let ev = m.handle(&face(), t0 + S);
        assert_eq!(m.state(), AuthState::Online);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Face));
        assert!(ev.contains(&CoreEvent::AuthSuccess { method: AuthMethod::Face }));
        assert!(ev.contains(&CoreEvent::StateChanged { new_state: AuthState::Online }));
    }

    #[test]
    fn biometric_shortcut() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        m.handle(&Signal::FaceDetected { biometric: true }, t0);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Biometric));
    }

    #[test]
    fn face_timeout_moves_to_voice_wait_with_prompt() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        assert!(m.tick(t0 + 4 * S).is_empty());
        let ev = m.tick(t0 + 5 * S);
        assert_eq!(m.state(), AuthState::VoiceWait);
        assert!(m.session().prompt_visible);
        assert!(m.session().voice_enabled);
        assert_eq!(ev, vec![CoreEvent::StateChanged { new_state: AuthState::VoiceWait }]);
    }

    #[test]
    fn voice_timeout_moves_to_password_wait() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        m.tick(t0 + 6 * S);
        m.tick(t0 + 19 * S);
        assert_eq!(m.state(), AuthState::VoiceWait);
        m.tick(t0 + 20 * S);
        assert_eq!(m.state(), AuthState::PasswordWait);
    }

    #[test]
    fn late_tick_walks_through_both_fallbacks() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        let ev = m.tick(t0 + 30 * S);
        assert_eq!(m.state(), AuthState::PasswordWait);
        assert_eq!(ev.len(), 2);
    }

    #[test]
    fn fist_only_counts_with_prompt() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        let fist = Signal::GestureClass(GestureClass::Fist);
        m.handle(&fist, t0 + S);
        assert_eq!(m.state(), AuthState::FaceWait);
        m.handle(&fist, t0 + 25 * S);
        assert_eq!(m.state(), AuthState::Online);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Fist));
    }

    #[test]
    fn voice_phrase_after_recogniser_enabled() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        let said = Signal::VoicePhraseHeard("well hello there".into());
        m.handle(&said, t0 + S);
        assert_eq!(m.state(), AuthState::FaceWait);
        m.handle(&said, t0 + 6 * S);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Voice));
    }

    #[test]
    fn unrelated_phrase_ignored() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        m.handle(&Signal::VoicePhraseHeard("good morning".into()), t0 + 6 * S);
        assert_eq!(m.state(), AuthState::VoiceWait);
    }

    #[test]
    fn typed_override_from_initializing() {
        let t0 = Instant::now();
        let mut m = AuthStateMachine::new(AuthConfig::default(), t0);
        for c in "xxJARVIS".chars() {
            m.handle(&Signal::Key(c), t0);
        }
        assert_eq!(m.state(), AuthState::Online);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Override));
    }

    #[test]
    fn online_is_terminal_and_idempotent() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        m.handle(&face(), t0);
        let before = m.session().clone();
        let ev = m.handle(&Signal::GestureClass(GestureClass::Fist), t0 + 30 * S);
        assert!(ev.is_empty());
        assert_eq!(m.session(), &before);
        assert!(m.sensors_failed(SensorError::CameraUnavailable("gone".into())).is_empty());
        assert_eq!(m.state(), AuthState::Online);
    }

    #[test]
    fn online_implies_method() {
        let signals = [
            face(),
            Signal::GestureClass(GestureClass::Fist),
            Signal::VoicePhraseHeard("zeno".into()),
            Signal::Key('j'),
            Signal::HandLandmarks(None),
        ];
        let (mut m, t0) = ready_machine(AuthConfig::default());
        for (k, s) in signals.iter().cycle().take(40).enumerate() {
            m.handle(s, t0 + Duration::from_millis(700 * k as u64));
            if m.is_online() {
                assert!(m.session().authenticated_via.is_some());
            }
        }
    }

    #[test]
    fn face_policy_before_prompt_only() {
        let (mut m, t0) = ready_machine(AuthConfig::default());
        m.tick(t0 + 6 * S);
        m.handle(&face(), t0 + 7 * S);
        assert_eq!(m.state(), AuthState::VoiceWait);
    }

    #[test]
    fn face_policy_always() {
        let cfg = AuthConfig { face_policy: FacePolicy::Always, ..AuthConfig::default() };
        let (mut m, t0) = ready_machine(cfg);
        m.tick(t0 + 25 * S);
        assert_eq!(m.state(), AuthState::PasswordWait);
        m.handle(&face(), t0 + 26 * S);
        assert_eq!(m.session().authenticated_via, Some(AuthMethod::Face));
    }

    #[test]
    fn camera_failure_is_terminal() {
        let t0 = Instant::now();
        let mut m = AuthStateMachine::new(AuthConfig::default(), t0);
        let ev = m.sensors_failed(SensorError::CameraUnavailable("denied".into()));
        assert_eq!(ev, vec![CoreEvent::StateChanged { new_state: AuthState::Fault }]);
        assert!(m.sensors_ready(t0).is_empty());
        for c in "jarvis".chars() {
            m.handle(&Signal::Key(c), t0);
        }
        assert_eq!(m.state(), AuthState::Fault);
        assert_eq!(m.session().authenticated_via, None);
    }
}
