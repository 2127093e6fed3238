//! Application wiring.
//!
//! ```text
//!  FrameSource ──SourceEvent──▶ SensorSide ──CoreEvent──▶ EventBus ──▶ RenderSide.engine
//!                                  │                                        ▲
//!                                  └── BridgePublisher ──▶ store ──▶ BridgePoller
//! ```
//!
//! An [`App`] owns whichever halves its [`Role`] asks for, plus the
//! cooperative [`Scheduler`] that drives auth deadlines, bridge polling,
//! telemetry and audio sampling.  Everything runs on the main thread; only
//! the frame source lives on its own thread and talks over a channel.

use std::cell::{Cell, Ref, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use bridge_doc::{
    BridgeDocument, BridgeError, BridgePatch, BridgePoller, BridgePublisher, BridgeSnapshot,
    BridgeStore, FileBridge, HandPos, MemoryBridge, PollOutcome, SessionStatus,
};
use particle_field::{open_default_source, AmplitudeSource, FieldConfig, ParticleFieldEngine, Silence};
use sensor_auth::{
    AuthConfig, AuthState, AuthStateMachine, CoreEvent, DetectorFrame, EventBus, EventKind,
    GestureClass, GestureClassifier, GestureSample, GestureUpdate, HandAnchor, SensorAdapter, Signal,
};

use crate::gesture::{spawn_frame_source, SimInput, SimKey, SourceEvent};
use crate::scheduler::Scheduler;
use crate::visualizer::{HudInfo, Visualizer};

/// Auth deadlines are checked this often.
const SENSOR_TICK:    Duration = Duration::from_millis(50);
const AUDIO_INTERVAL: Duration = Duration::from_millis(50);
/// Longest step the engine takes after a stalled frame.
const MAX_FRAME_DT:   f32      = 0.1;

/// Bridge file used when the two halves run apart and no path was given.
pub const DEFAULT_BRIDGE_FILE: &str = "aether_hud_bridge.json";

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not open window: {0}")]
    Window(String),

    #[error("could not read config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

// ════════════════════════════════════════════════════════════════════════════
// Profile / Role
// ════════════════════════════════════════════════════════════════════════════

/// Preset bundles of field size, hand anchor and face window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Full field, wrist anchor, 5 s face window.
    #[default]
    Aether,
    /// Compact hand-modulated field, middle-knuckle anchor, 10 s face window.
    Zeno,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        match self {
            Profile::Aether => "aether",
            Profile::Zeno   => "zeno",
        }
    }

    pub fn field(&self) -> FieldConfig {
        match self {
            Profile::Aether => FieldConfig::default(),
            Profile::Zeno   => FieldConfig::compact(),
        }
    }

    pub fn anchor(&self) -> HandAnchor {
        match self {
            Profile::Aether => HandAnchor::Wrist,
            Profile::Zeno   => HandAnchor::MiddleMcp,
        }
    }

    pub fn auth(&self) -> AuthConfig {
        match self {
            Profile::Aether => AuthConfig::default(),
            Profile::Zeno   => AuthConfig { face_timeout_ms: 10_000, ..AuthConfig::default() },
        }
    }
}

/// Which half (or both) this process runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sensors, auth and bridge writes.  No particle field.
    Sensor,
    /// Bridge polling and the particle field.  No sensors.
    Render,
    #[default]
    Both,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Sensor => "sensor",
            Role::Render => "render",
            Role::Both   => "both",
        }
    }

    pub fn has_sensor(&self) -> bool {
        matches!(self, Role::Sensor | Role::Both)
    }

    pub fn has_renderer(&self) -> bool {
        matches!(self, Role::Render | Role::Both)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile:               Profile,
    pub role:                  Role,
    /// Shared bridge file.  `None` means in-memory for `Both`, a temp file otherwise.
    pub bridge_path:           Option<PathBuf>,
    pub auth:                  AuthConfig,
    pub field:                 FieldConfig,
    pub anchor:                HandAnchor,
    pub poll_interval_ms:      u64,
    pub telemetry_interval_ms: u64,
    /// Voice amplitude at or above which an online session reports LISTENING.
    pub listen_threshold:      f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

impl AppConfig {
    pub fn for_profile(profile: Profile) -> Self {
        AppConfig {
            profile,
            role:                  Role::default(),
            bridge_path:           None,
            auth:                  profile.auth(),
            field:                 profile.field(),
            anchor:                profile.anchor(),
            poll_interval_ms:      100,
            telemetry_interval_ms: 100,
            listen_threshold:      0.25,
        }
    }

    /// Read a JSON file over a profile's defaults.  Fields the file leaves
    /// out, at any depth, keep the profile's values.  `profile` wins over a
    /// `"profile"` key in the file.
    pub fn load(path: &Path, profile: Option<Profile>) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|source| AppError::Config { path: path.to_path_buf(), source })?;
        let overlay: Value = serde_json::from_str(&text)?;

        let profile = profile
            .or_else(|| overlay.get("profile").and_then(|v| Profile::deserialize(v).ok()))
            .unwrap_or_default();

        let mut merged = serde_json::to_value(Self::for_profile(profile))?;
        merge(&mut merged, overlay);
        let mut cfg: AppConfig = serde_json::from_value(merged)?;
        cfg.profile = profile;
        Ok(cfg)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                merge(b.entry(k).or_insert(Value::Null), v);
            }
        }
        (b, o) => *b = o,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Command line
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Parser)]
#[command(name = "aether_hud", version, about = "Gesture- and voice-driven sign-in HUD")]
pub struct CliArgs {
    /// Skip the interactive prompts.
    #[arg(long)]
    pub quick: bool,
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,
    #[arg(long, value_enum)]
    pub role: Option<Role>,
    /// Bridge document shared between a sensor and a render process.
    #[arg(long)]
    pub bridge: Option<PathBuf>,
    /// JSON file overriding any configuration field.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn resolve(&self) -> Result<AppConfig, AppError> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::load(path, self.profile)?,
            None       => AppConfig::for_profile(self.profile.unwrap_or_default()),
        };
        if let Some(role) = self.role {
            cfg.role = role;
        }
        if let Some(path) = &self.bridge {
            cfg.bridge_path = Some(path.clone());
        }
        Ok(cfg)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SensorSide — producer
// ════════════════════════════════════════════════════════════════════════════

/// Adapter, auth machine and bridge writer.
pub struct SensorSide<S: BridgeStore> {
    adapter:          SensorAdapter,
    machine:          AuthStateMachine,
    publisher:        BridgePublisher<S>,
    listen_threshold: f32,
    listening:        bool,
    amplitude:        f32,
    last_sample:      Option<GestureSample>,
    /// Status and auth type of the last successful write.
    published:        Option<(SessionStatus, &'static str)>,
}

impl<S: BridgeStore> SensorSide<S> {
    pub fn new(cfg: &AppConfig, store: S, now: Instant) -> Self {
        SensorSide {
            adapter:          SensorAdapter::new(GestureClassifier::new(cfg.anchor), cfg.auth.biometric_depth),
            machine:          AuthStateMachine::new(cfg.auth.clone(), now),
            publisher:        BridgePublisher::new(store),
            listen_threshold: cfg.listen_threshold,
            listening:        false,
            amplitude:        0.0,
            last_sample:      None,
            published:        None,
        }
    }

    pub fn machine(&self) -> &AuthStateMachine {
        &self.machine
    }

    pub fn snapshot(&self) -> &BridgeSnapshot {
        self.publisher.snapshot()
    }

    pub fn listening(&self) -> bool {
        self.listening
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn on_source(&mut self, event: &SourceEvent, now: Instant) -> Vec<CoreEvent> {
        match event {
            SourceEvent::Ready      => self.machine.sensors_ready(now),
            SourceEvent::Failed(e)  => self.machine.sensors_failed(e.clone()),
            SourceEvent::Frame(f)   => self.on_frame(f, now),
            SourceEvent::Quit       => Vec::new(),
        }
    }

    /// Auth events for the frame, followed by the classifier update.
    pub fn on_frame(&mut self, frame: &DetectorFrame, now: Instant) -> Vec<CoreEvent> {
        let adapted = self.adapter.adapt(frame);
        self.last_sample = adapted.sample();
        let mut out = self.machine.handle_all(&adapted.signals, now);
        out.push(CoreEvent::GestureUpdate(adapted.gesture));
        out
    }

    pub fn on_key(&mut self, c: char, now: Instant) -> Vec<CoreEvent> {
        self.machine.handle(&Signal::Key(c), now)
    }

    pub fn tick(&mut self, now: Instant) -> Vec<CoreEvent> {
        self.machine.tick(now)
    }

    pub fn set_listening(&mut self, on: bool) {
        if on != self.listening {
            debug!(listening = on, "listening flag");
        }
        self.listening = on;
    }

    /// Non-finite input reads as silence.
    pub fn set_amplitude(&mut self, a: f32) {
        self.amplitude = if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Wire status for the current session.  A faulted session stays on
    /// INITIALIZING so the renderer keeps its boot field.
    pub fn status(&self) -> SessionStatus {
        match self.machine.state() {
            AuthState::Initializing | AuthState::Fault => SessionStatus::Initializing,
            AuthState::FaceWait | AuthState::VoiceWait | AuthState::PasswordWait => SessionStatus::AuthPending,
            AuthState::Online if self.listening || self.amplitude >= self.listen_threshold => {
                SessionStatus::Listening
            }
            AuthState::Online => SessionStatus::Online,
        }
    }

    pub fn auth_type(&self) -> &'static str {
        let session = self.machine.session();
        match session.authenticated_via {
            Some(m) => m.as_str(),
            None if session.prompt_visible => "PENDING_FIST_OVERRIDE",
            None => "NONE",
        }
    }

    /// Status fields always; telemetry only once signed in.
    pub fn patch(&self) -> BridgePatch {
        let mut patch = BridgePatch::new().status(self.status()).auth_type(self.auth_type());
        if self.machine.is_online() {
            patch = patch.voice_amplitude(self.amplitude);
            patch = match self.last_sample {
                Some(s) => patch
                    .hand_pos(HandPos::new(s.hand_x, s.hand_y, s.hand_z))
                    .active_gesture(s.class().as_str()),
                None => patch.no_hand().active_gesture(GestureClass::None.as_str()),
            };
        }
        patch
    }

    pub fn publish(&mut self) -> Result<(), BridgeError> {
        let key = (self.status(), self.auth_type());
        self.publisher.publish(self.patch())?;
        self.published = Some(key);
        Ok(())
    }

    /// Write only if the status or auth type moved since the last write.
    pub fn publish_if_changed(&mut self) -> Result<bool, BridgeError> {
        if self.published == Some((self.status(), self.auth_type())) {
            return Ok(false);
        }
        self.publish().map(|()| true)
    }

    /// Periodic write.  Before sign-in only status changes go out.
    pub fn publish_telemetry(&mut self) -> Result<bool, BridgeError> {
        if self.machine.is_online() {
            self.publish().map(|()| true)
        } else {
            self.publish_if_changed()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RenderSide — consumer
// ════════════════════════════════════════════════════════════════════════════

/// Bridge reader and particle field.
pub struct RenderSide<S: BridgeStore> {
    poller:          BridgePoller<S>,
    engine:          ParticleFieldEngine,
    /// Take sign-in and gestures from the document, for a renderer with no
    /// bus of its own.
    follow_document: bool,
    last_status:     Option<SessionStatus>,
}

impl<S: BridgeStore> RenderSide<S> {
    pub fn new(engine: ParticleFieldEngine, store: S, follow_document: bool) -> Self {
        RenderSide { poller: BridgePoller::new(store), engine, follow_document, last_status: None }
    }

    pub fn engine(&self) -> &ParticleFieldEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ParticleFieldEngine {
        &mut self.engine
    }

    pub fn document(&self) -> Option<&BridgeDocument> {
        self.poller.last()
    }

    /// Returns `true` if a new document was applied.  Never fails.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.poller.poll() {
            PollOutcome::Updated(doc) => {
                self.apply(&doc, now);
                true
            }
            _ => false,
        }
    }

    fn apply(&mut self, doc: &BridgeDocument, now: Instant) {
        if self.follow_document {
            if let Some(s) = doc.status {
                let signed_in = |s: SessionStatus| matches!(s, SessionStatus::Online | SessionStatus::Listening);
                if signed_in(s) && self.last_status.is_some_and(|p| !signed_in(p)) {
                    self.engine.trigger_explosion();
                }
                self.last_status = Some(s);
            }
            if let Some(update) = document_gesture(doc) {
                self.engine.apply_gesture(&update, now);
            }
        }
        self.engine.apply_document(doc);
    }
}

/// Rebuild a classifier update from a document's gesture fields.  Pinch is
/// not carried on the wire and comes back as NaN.
pub fn document_gesture(doc: &BridgeDocument) -> Option<GestureUpdate> {
    let class = match doc.active_gesture.as_deref()? {
        "FIST"    => GestureClass::Fist,
        "PALM"    => GestureClass::OpenPalm,
        "VICTORY" => GestureClass::Victory,
        _         => return Some(GestureUpdate::Idle),
    };
    let hand = doc.hand();
    Some(GestureUpdate::Hand(GestureSample {
        pinch_distance: f32::NAN,
        hand_x:         hand.map_or(f32::NAN, |h| h.x),
        hand_y:         hand.map_or(f32::NAN, |h| h.y),
        hand_z:         hand.map_or(f32::NAN, |h| h.z),
        is_fist:        class == GestureClass::Fist,
        is_victory:     class == GestureClass::Victory,
        is_open_palm:   class == GestureClass::OpenPalm,
    }))
}

/// Collapse a burst of frames into one.  The newest frame's detections win;
/// keys and transcripts from every frame are kept.
pub fn coalesce_frames(frames: Vec<DetectorFrame>) -> Option<DetectorFrame> {
    let mut keys = Vec::new();
    let mut transcript: Option<String> = None;
    let mut last = None;
    for mut f in frames {
        keys.append(&mut f.keys);
        if let Some(t) = f.transcript.take() {
            transcript = Some(match transcript {
                Some(prev) => format!("{} {}", prev, t),
                None       => t,
            });
        }
        last = Some(f);
    }
    last.map(|f| DetectorFrame { keys, transcript, ..f })
}

// ════════════════════════════════════════════════════════════════════════════
// App
// ════════════════════════════════════════════════════════════════════════════

pub type SharedStore = Arc<dyn BridgeStore>;

/// Scheduled work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    SensorTick,
    PollBridge,
    PublishTelemetry,
    SampleAudio,
}

pub struct App {
    sensor:     Option<SensorSide<SharedStore>>,
    render:     Option<Rc<RefCell<RenderSide<SharedStore>>>>,
    bus:        EventBus,
    /// Time of the event being dispatched, read by bus listeners.
    clock:      Rc<Cell<Instant>>,
    scheduler:  Scheduler<Task>,
    audio:      Box<dyn AmplitudeSource>,
    last_frame: Instant,
}

impl App {
    /// Fails only if the first bridge write does.
    pub fn new(
        cfg: &AppConfig,
        store: SharedStore,
        audio: Box<dyn AmplitudeSource>,
        now: Instant,
    ) -> Result<Self, AppError> {
        let mut scheduler = Scheduler::new();
        let mut bus = EventBus::new();
        let clock = Rc::new(Cell::new(now));

        let sensor = if cfg.role.has_sensor() {
            let mut side = SensorSide::new(cfg, Arc::clone(&store), now);
            side.publish()?;
            scheduler.every(now, SENSOR_TICK, Task::SensorTick);
            scheduler.every(now, cfg.telemetry_interval(), Task::PublishTelemetry);
            scheduler.every(now, AUDIO_INTERVAL, Task::SampleAudio);
            Some(side)
        } else {
            None
        };

        let render = if cfg.role.has_renderer() {
            let engine = ParticleFieldEngine::new(cfg.field.clone());
            let side = Rc::new(RefCell::new(RenderSide::new(engine, Arc::clone(&store), cfg.role == Role::Render)));
            if cfg.role == Role::Both {
                for kind in [EventKind::AuthSuccess, EventKind::GestureUpdate] {
                    let side = Rc::clone(&side);
                    let clock = Rc::clone(&clock);
                    bus.subscribe(kind, move |e| side.borrow_mut().engine_mut().on_event(e, clock.get()));
                }
            }
            scheduler.every(now, cfg.poll_interval(), Task::PollBridge);
            Some(side)
        } else {
            None
        };

        Ok(App { sensor, render, bus, clock, scheduler, audio, last_frame: now })
    }

    pub fn sensor(&self) -> Option<&SensorSide<SharedStore>> {
        self.sensor.as_ref()
    }

    pub fn sensor_mut(&mut self) -> Option<&mut SensorSide<SharedStore>> {
        self.sensor.as_mut()
    }

    pub fn render(&self) -> Option<Ref<'_, RenderSide<SharedStore>>> {
        self.render.as_ref().map(|r| r.borrow())
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Returns `false` when the source asked to quit.
    pub fn on_source(&mut self, event: SourceEvent, now: Instant) -> bool {
        if event == SourceEvent::Quit {
            return false;
        }
        if let Some(s) = self.sensor.as_mut() {
            let events = s.on_source(&event, now);
            self.dispatch(&events, now);
        }
        true
    }

    pub fn on_key(&mut self, c: char, now: Instant) {
        if let Some(s) = self.sensor.as_mut() {
            let events = s.on_key(c, now);
            self.dispatch(&events, now);
        }
    }

    pub fn toggle_listening(&mut self, now: Instant) {
        if let Some(s) = self.sensor.as_mut() {
            let on = !s.listening();
            s.set_listening(on);
            self.dispatch(&[], now);
        }
    }

    fn dispatch(&mut self, events: &[CoreEvent], now: Instant) {
        self.clock.set(now);
        self.bus.publish_all(events);
        if let Some(s) = self.sensor.as_mut() {
            s.publish_if_changed().ok();
        }
    }

    pub fn run_due(&mut self, now: Instant) {
        for task in self.scheduler.due(now) {
            self.run_task(task, now);
        }
    }

    pub fn run_task(&mut self, task: Task, now: Instant) {
        match task {
            Task::SensorTick => {
                if let Some(s) = self.sensor.as_mut() {
                    let events = s.tick(now);
                    self.dispatch(&events, now);
                }
            }
            Task::PollBridge => {
                if let Some(r) = &self.render {
                    r.borrow_mut().poll(now);
                }
            }
            Task::PublishTelemetry => {
                if let Some(s) = self.sensor.as_mut() {
                    s.publish_telemetry().ok();
                }
            }
            Task::SampleAudio => {
                let a = self.audio.amplitude();
                if let Some(s) = self.sensor.as_mut() {
                    s.set_amplitude(a);
                }
            }
        }
    }

    /// Step the field by the wall time since the previous call.
    pub fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_frame).as_secs_f32().min(MAX_FRAME_DT);
        self.last_frame = now;
        if let Some(r) = &self.render {
            r.borrow_mut().engine_mut().step(dt);
        }
    }

    pub fn draw(&self, vis: &mut Visualizer) {
        let render = self.render();
        match &render {
            Some(r) => r.engine().render(vis),
            None    => vis.clear(),
        }

        let (visual, shape) = match &render {
            Some(r) => (r.engine().state().as_str(), r.engine().shape().name()),
            None    => ("-", "-"),
        };

        match &self.sensor {
            Some(s) => vis.draw_hud(&HudInfo {
                status:    s.machine().state().status_text(),
                visual,
                shape,
                auth:      s.auth_type(),
                amplitude: s.amplitude(),
                prompt:    s.machine().session().prompt_visible,
                listening: s.status() == SessionStatus::Listening,
            }),
            None => {
                let doc = render.as_ref().and_then(|r| r.document().cloned()).unwrap_or_default();
                let status = doc.status.unwrap_or_default();
                let line = format!("[{}]", status.as_str());
                vis.draw_hud(&HudInfo {
                    status:    &line,
                    visual,
                    shape,
                    auth:      doc.auth_type.as_deref().unwrap_or("NONE"),
                    amplitude: doc.amplitude().unwrap_or(0.0),
                    prompt:    doc.auth_type.as_deref() == Some("PENDING_FIST_OVERRIDE"),
                    listening: status == SessionStatus::Listening,
                });
            }
        }
    }

    /// Cancel every timer, drop every bus listener and release the audio
    /// device.  Returns how many timers were pending.
    pub fn shutdown(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        self.bus.clear();
        self.audio = Box::new(Silence);
        cancelled
    }
}

pub fn open_store(cfg: &AppConfig) -> SharedStore {
    match (&cfg.bridge_path, cfg.role) {
        (Some(path), _)    => Arc::new(FileBridge::new(path.clone())),
        (None, Role::Both) => Arc::new(MemoryBridge::new()),
        (None, _)          => Arc::new(FileBridge::new(std::env::temp_dir().join(DEFAULT_BRIDGE_FILE))),
    }
}

/// Simulation input channel (if any) and the frame source's event channel.
fn spawn_source(role: Role) -> (Option<Sender<SimInput>>, Option<Receiver<SourceEvent>>) {
    if !role.has_sensor() {
        return (None, None);
    }
    #[cfg(feature = "leap")]
    {
        (None, Some(spawn_frame_source(crate::gesture::LeapFrameSource)))
    }
    #[cfg(not(feature = "leap"))]
    {
        let (tx, rx) = std::sync::mpsc::channel();
        (Some(tx), Some(spawn_frame_source(crate::gesture::SimFrameSource { rx })))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Opens the bridge, the audio source and the window, starts the frame
/// source (keyboard simulation by default, hardware with `--features leap`)
/// and drives input, scheduled tasks and rendering at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let store = open_store(&cfg);
    let audio: Box<dyn AmplitudeSource> = if cfg.role.has_sensor() {
        open_default_source()
    } else {
        Box::new(Silence)
    };
    let mut app = App::new(&cfg, store, audio, Instant::now())?;

    let title = format!("Aether HUD  {} / {}", cfg.profile.name(), cfg.role.name());
    let mut vis = Visualizer::new(&title).map_err(AppError::Window)?;

    let (sim_tx, mut source_rx) = spawn_source(cfg.role);
    info!(
        profile = cfg.profile.name(),
        role = cfg.role.name(),
        particles = cfg.field.particle_count,
        "hud running"
    );

    'main: while vis.is_open() {
        let now = Instant::now();

        // 1. Window input
        let Some(inputs) = vis.poll_input() else { break };
        for input in inputs {
            match input {
                SimInput::KeyDown(SimKey::ToggleListen) => app.toggle_listening(now),
                SimInput::Char(c) if sim_tx.is_none()   => app.on_key(c, now),
                other => {
                    if let Some(tx) = &sim_tx {
                        tx.send(other).ok();
                    }
                }
            }
        }

        // 2. Drain the frame source; only the newest frame's detections count
        let mut ended = false;
        if let Some(rx) = &source_rx {
            let mut frames = Vec::new();
            loop {
                match rx.try_recv() {
                    Ok(SourceEvent::Frame(f)) => frames.push(f),
                    Ok(event) => {
                        if !app.on_source(event, now) {
                            break 'main;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        ended = true;
                        break;
                    }
                }
            }
            if let Some(frame) = coalesce_frames(frames) {
                app.on_source(SourceEvent::Frame(frame), now);
            }
        }
        if ended {
            debug!("frame source ended");
            source_rx = None;
        }

        // 3. Timers, integration, render
        app.run_due(now);
        app.advance(now);
        app.draw(&mut vis);
        vis.present();
    }

    let cancelled = app.shutdown();
    info!(cancelled, "timers cancelled; shutting down");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use particle_field::shapes::stream_to_hand;
    use particle_field::{Shape, Vec3, VisualState};
    use sensor_auth::gesture::synthetic_hand;
    use sensor_auth::{AuthMethod, FaceBox, KeyEvent, SensorError};

    fn test_cfg(role: Role) -> AppConfig {
        let mut cfg = AppConfig::for_profile(Profile::Aether);
        cfg.role = role;
        cfg.field.particle_count = 2_000;
        cfg
    }

    fn app_with(role: Role) -> (App, MemoryBridge, Instant) {
        let store = MemoryBridge::new();
        let t0 = Instant::now();
        let app = App::new(&test_cfg(role), Arc::new(store.clone()), Box::new(Silence), t0).unwrap();
        (app, store, t0)
    }

    fn ms(t0: Instant, n: u64) -> Instant {
        t0 + Duration::from_millis(n)
    }

    fn read_doc(store: &MemoryBridge) -> BridgeDocument {
        BridgeDocument::parse(&store.read().unwrap().unwrap()).unwrap()
    }

    fn face_frame() -> DetectorFrame {
        DetectorFrame {
            faces: vec![FaceBox { x: 0.4, y: 0.3, width: 0.2, height: 0.3, score: 0.9 }],
            ..DetectorFrame::default()
        }
    }

    fn hand_frame(cx: f32, cy: f32, fingers: [bool; 4]) -> DetectorFrame {
        DetectorFrame {
            hands: vec![synthetic_hand(cx, cy, 0.0, fingers, 0.1).points().to_vec()],
            ..DetectorFrame::default()
        }
    }

    fn visual(app: &App) -> (VisualState, u64) {
        let r = app.render().unwrap();
        (r.engine().state(), r.engine().retarget_count())
    }

    fn type_secret(app: &mut App, now: Instant) {
        for c in "jarvis".chars() {
            app.on_key(c, now);
        }
    }

    #[test]
    fn status_sequence_drives_visual_states() {
        let (mut app, _store, t0) = app_with(Role::Both);

        app.run_due(ms(t0, 100));
        assert_eq!(visual(&app), (VisualState::Boot, 1));

        app.on_source(SourceEvent::Ready, ms(t0, 110));
        app.run_due(ms(t0, 200));
        assert_eq!(visual(&app), (VisualState::AuthFace, 2));

        app.on_source(SourceEvent::Frame(face_frame()), ms(t0, 250));
        assert!(app.render().unwrap().engine().is_exploding());
        app.run_due(ms(t0, 300));
        assert_eq!(visual(&app), (VisualState::Idle, 3));
        assert_eq!(app.sensor().unwrap().machine().session().authenticated_via, Some(AuthMethod::Face));
    }

    #[test]
    fn face_timeout_shows_fist_prompt() {
        let (mut app, store, t0) = app_with(Role::Both);
        app.on_source(SourceEvent::Ready, t0);

        app.run_due(ms(t0, 4_990));
        assert_eq!(app.sensor().unwrap().machine().state(), AuthState::FaceWait);

        app.run_due(ms(t0, 5_040));
        let s = app.sensor().unwrap();
        assert_eq!(s.machine().state(), AuthState::VoiceWait);
        assert!(s.machine().session().prompt_visible);
        let doc = read_doc(&store);
        assert_eq!(doc.status, Some(SessionStatus::AuthPending));
        assert_eq!(doc.auth_type.as_deref(), Some("PENDING_FIST_OVERRIDE"));

        app.on_source(SourceEvent::Frame(hand_frame(0.5, 0.5, [false; 4])), ms(t0, 5_100));
        assert_eq!(read_doc(&store).auth_type.as_deref(), Some("FIST"));
        assert_eq!(read_doc(&store).status, Some(SessionStatus::Online));
    }

    #[test]
    fn victory_twice_advances_once() {
        let (mut app, _store, t0) = app_with(Role::Both);
        app.on_source(SourceEvent::Ready, t0);
        app.on_source(SourceEvent::Frame(face_frame()), ms(t0, 10));

        let victory = hand_frame(0.5, 0.5, [true, true, false, false]);
        app.on_source(SourceEvent::Frame(victory.clone()), ms(t0, 1_000));
        app.on_source(SourceEvent::Frame(victory.clone()), ms(t0, 2_000));
        assert_eq!(app.render().unwrap().engine().shape(), Shape::Heart);

        app.on_source(SourceEvent::Frame(victory), ms(t0, 2_600));
        assert_eq!(app.render().unwrap().engine().shape(), Shape::Saturn);
    }

    #[test]
    fn missing_or_malformed_document_keeps_state() {
        let store = MemoryBridge::new();
        let engine = ParticleFieldEngine::new(FieldConfig { particle_count: 2_000, ..FieldConfig::default() });
        let mut side = RenderSide::new(engine, store.clone(), false);
        let now = Instant::now();

        assert!(!side.poll(now));
        assert_eq!(side.engine().state(), VisualState::Boot);

        store.write(r#"{"status":"ONLINE","version":1}"#).unwrap();
        assert!(side.poll(now));
        assert_eq!(side.engine().state(), VisualState::Idle);

        store.write("{not json").unwrap();
        assert!(!side.poll(now));
        store.clear().unwrap();
        assert!(!side.poll(now));
        assert_eq!(side.engine().state(), VisualState::Idle);
    }

    #[test]
    fn no_telemetry_before_sign_in() {
        let (mut app, store, t0) = app_with(Role::Sensor);
        assert!(app.render().is_none());
        app.on_source(SourceEvent::Ready, t0);
        app.on_source(SourceEvent::Frame(hand_frame(0.8, 0.4, [true; 4])), ms(t0, 50));
        app.run_due(ms(t0, 200));

        let doc = read_doc(&store);
        assert_eq!(doc.version, Some(2));
        assert_eq!(doc.hand_pos, None);
        assert_eq!(doc.active_gesture.as_deref(), Some("NONE"));

        type_secret(&mut app, ms(t0, 250));
        let doc = read_doc(&store);
        assert_eq!(doc.auth_type.as_deref(), Some("OVERRIDE"));
        assert_eq!(doc.active_gesture.as_deref(), Some("PALM"));
        assert!((doc.hand().unwrap().x - 0.8).abs() < 1e-5);

        let before = doc.version.unwrap();
        app.run_due(ms(t0, 300));
        assert!(read_doc(&store).version.unwrap() > before);
    }

    #[test]
    fn listening_flag_and_loud_voice() {
        let (mut app, store, t0) = app_with(Role::Sensor);
        app.on_source(SourceEvent::Ready, t0);
        type_secret(&mut app, t0);
        assert_eq!(read_doc(&store).status, Some(SessionStatus::Online));

        app.toggle_listening(ms(t0, 10));
        assert_eq!(read_doc(&store).status, Some(SessionStatus::Listening));
        app.toggle_listening(ms(t0, 20));
        assert_eq!(read_doc(&store).status, Some(SessionStatus::Online));

        let s = app.sensor_mut().unwrap();
        s.set_amplitude(0.9);
        assert_eq!(s.status(), SessionStatus::Listening);
        s.set_amplitude(f32::NAN);
        assert_eq!(s.status(), SessionStatus::Online);
    }

    fn stream_end(app: &App) -> Vec3 {
        let r = app.render().unwrap();
        let e = r.engine();
        let n = e.particle_count();
        stream_to_hand(n - 1, n, e.hand(), e.config().field_extent, e.time())
    }

    #[test]
    fn stream_follows_hand_and_falls_back_to_origin() {
        let (mut app, store, t0) = app_with(Role::Both);
        app.on_source(SourceEvent::Ready, t0);
        type_secret(&mut app, ms(t0, 10));
        app.toggle_listening(ms(t0, 20));
        app.run_due(ms(t0, 100));
        app.run_due(ms(t0, 200));

        // Signed in and listening, no hand seen yet.
        assert_eq!(read_doc(&store).hand_pos, None);
        assert_eq!(visual(&app).0, VisualState::Action);
        assert_eq!(app.render().unwrap().engine().hand(), None);
        assert!(stream_end(&app).length() < 1.0);

        app.on_source(SourceEvent::Frame(hand_frame(0.9, 0.35, [true; 4])), ms(t0, 250));
        app.run_due(ms(t0, 300));
        app.run_due(ms(t0, 400));
        assert!(read_doc(&store).hand().is_some());
        assert!(app.render().unwrap().engine().hand().is_some());
        assert!(stream_end(&app).length() > 5.0);

        // Hand leaves the frame.
        app.on_source(SourceEvent::Frame(DetectorFrame::default()), ms(t0, 450));
        assert_eq!(app.render().unwrap().engine().hand(), None);
        app.run_due(ms(t0, 500));
        app.run_due(ms(t0, 600));
        let doc = read_doc(&store);
        assert_eq!(doc.hand_pos, None);
        assert_eq!(doc.active_gesture.as_deref(), Some("NONE"));
        assert_eq!(app.render().unwrap().engine().hand(), None);
        assert!(stream_end(&app).length() < 1.0);
    }

    #[test]
    fn render_role_drops_hand_when_document_loses_it() {
        let (mut app, store, t0) = app_with(Role::Render);
        store
            .write(r#"{"status":"LISTENING","hand_pos":{"x":0.9,"y":0.35,"z":0.0},"active_gesture":"PALM","version":1}"#)
            .unwrap();
        app.run_due(ms(t0, 100));
        assert!(app.render().unwrap().engine().hand().is_some());

        store
            .write(r#"{"status":"LISTENING","hand_pos":null,"active_gesture":"NONE","version":2}"#)
            .unwrap();
        app.run_due(ms(t0, 200));
        assert_eq!(app.render().unwrap().engine().hand(), None);
        assert!(stream_end(&app).length() < 1.0);
    }

    #[test]
    fn sensor_fault_stays_initializing() {
        let (mut app, store, t0) = app_with(Role::Both);
        app.on_source(SourceEvent::Failed(SensorError::CameraUnavailable("no device".into())), t0);
        app.on_source(SourceEvent::Frame(face_frame()), ms(t0, 10));

        let s = app.sensor().unwrap();
        assert_eq!(s.machine().state(), AuthState::Fault);
        assert_eq!(s.machine().state().status_text(), "[HARDWARE ERROR]");
        assert_eq!(read_doc(&store).status, Some(SessionStatus::Initializing));
        app.run_due(ms(t0, 100));
        assert_eq!(visual(&app).0, VisualState::Boot);
    }

    #[test]
    fn render_role_follows_document() {
        let (mut app, store, t0) = app_with(Role::Render);
        assert!(app.sensor().is_none());

        store.write(r#"{"status":"AUTH_PENDING","version":1}"#).unwrap();
        app.run_due(ms(t0, 100));
        assert_eq!(visual(&app).0, VisualState::AuthFace);

        store
            .write(r#"{"status":"ONLINE","active_gesture":"VICTORY","auth_type":"FACE","version":2}"#)
            .unwrap();
        app.run_due(ms(t0, 200));
        let r = app.render().unwrap();
        assert!(r.engine().is_exploding());
        assert_eq!(r.engine().state(), VisualState::Idle);
        assert_eq!(r.engine().shape(), Shape::Heart);
    }

    #[test]
    fn quit_and_shutdown() {
        let (mut app, _store, t0) = app_with(Role::Both);
        assert!(!app.on_source(SourceEvent::Quit, t0));
        assert_eq!(app.pending_timers(), 4);
        assert_eq!(app.shutdown(), 4);
        app.on_source(SourceEvent::Ready, t0);
        app.run_due(ms(t0, 60_000));
        assert_eq!(app.sensor().unwrap().machine().state(), AuthState::FaceWait);
    }

    #[test]
    fn unwritable_bridge_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let store: SharedStore = Arc::new(FileBridge::new(dir.path().join("missing/bridge.json")));
        let err = App::new(&test_cfg(Role::Sensor), store, Box::new(Silence), Instant::now());
        assert!(matches!(err, Err(AppError::Bridge(_))));
    }

    #[test]
    fn frames_coalesce_to_newest() {
        let mut a = face_frame();
        a.keys = vec![KeyEvent::Char('j')];
        a.transcript = Some("hello".into());
        let mut b = hand_frame(0.5, 0.5, [true; 4]);
        b.keys = vec![KeyEvent::Char('a')];
        b.transcript = Some("zeno".into());

        let f = coalesce_frames(vec![a, b]).unwrap();
        assert!(f.faces.is_empty());
        assert_eq!(f.hands.len(), 1);
        assert_eq!(f.keys, vec![KeyEvent::Char('j'), KeyEvent::Char('a')]);
        assert_eq!(f.transcript.as_deref(), Some("hello zeno"));
        assert!(coalesce_frames(Vec::new()).is_none());
    }

    #[test]
    fn document_gesture_round_trip() {
        let doc = BridgeDocument::parse(
            r#"{"active_gesture":"FIST","hand_pos":{"x":0.2,"y":0.3,"z":0.0}}"#,
        )
        .unwrap();
        match document_gesture(&doc) {
            Some(GestureUpdate::Hand(s)) => {
                assert!(s.is_fist && !s.is_victory);
                assert_eq!(s.hand_x, 0.2);
                assert!(s.pinch_distance.is_nan());
            }
            other => panic!("unexpected {:?}", other),
        }
        let none = BridgeDocument::parse(r#"{"active_gesture":"NONE"}"#).unwrap();
        assert_eq!(document_gesture(&none), Some(GestureUpdate::Idle));
        assert_eq!(document_gesture(&BridgeDocument::default()), None);
    }

    #[test]
    fn cli_flags_resolve() {
        let args = CliArgs::try_parse_from([
            "aether_hud", "--quick", "--profile", "zeno", "--role", "render", "--bridge", "/tmp/b.json",
        ])
        .unwrap();
        assert!(args.quick);
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.profile, Profile::Zeno);
        assert_eq!(cfg.role, Role::Render);
        assert_eq!(cfg.field.particle_count, 12_000);
        assert_eq!(cfg.anchor, HandAnchor::MiddleMcp);
        assert_eq!(cfg.auth.face_timeout_ms, 10_000);
        assert_eq!(cfg.bridge_path, Some(PathBuf::from("/tmp/b.json")));

        assert!(CliArgs::try_parse_from(["aether_hud", "--role", "sideways"]).is_err());
        let plain = CliArgs::try_parse_from(["aether_hud"]).unwrap().resolve().unwrap();
        assert_eq!(plain, AppConfig::default());
    }

    #[test]
    fn config_file_overlays_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hud.json");
        fs::write(
            &path,
            r#"{"profile":"zeno","auth":{"override_secret":"open sesame"},"poll_interval_ms":250}"#,
        )
        .unwrap();

        let cfg = AppConfig::load(&path, None).unwrap();
        assert_eq!(cfg.profile, Profile::Zeno);
        assert_eq!(cfg.field.particle_count, 12_000);
        assert_eq!(cfg.auth.face_timeout_ms, 10_000);
        assert_eq!(cfg.auth.override_secret, "open sesame");
        assert_eq!(cfg.auth.wake_phrases, AuthConfig::default().wake_phrases);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));

        let forced = AppConfig::load(&path, Some(Profile::Aether)).unwrap();
        assert_eq!(forced.profile, Profile::Aether);
        assert_eq!(forced.field.particle_count, 150_000);

        assert!(matches!(
            AppConfig::load(&dir.path().join("absent.json"), None),
            Err(AppError::Config { .. })
        ));
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(AppConfig::load(&path, None), Err(AppError::ConfigParse(_))));
    }
}
