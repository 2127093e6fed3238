//! Detector frames, from hand-tracking hardware or the keyboard simulator.
//!
//! The public interface is [`SourceEvent`] delivered over an `mpsc` channel.
//! Consumers don't need to know whether frames came from real hardware or
//! the simulator; either way they are [`DetectorFrame`]s ready for the
//! sensor adapter.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use sensor_auth::gesture::synthetic_hand;
use sensor_auth::{DetectorFrame, FaceBox, KeyEvent, SensorError};

/// Nominal detector rate for the simulator.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(33);

// ════════════════════════════════════════════════════════════════════════════
// SourceEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// Camera and models are up; the auth flow may start.
    Ready,
    Frame(DetectorFrame),
    /// Acquisition failed.  No further frames will follow.
    Failed(SensorError),
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`SourceEvent`]s over a channel.
pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source<S: FrameSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// LeapFrameSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Frame source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Each tracked hand is converted into the 21-point skeleton the classifier
/// expects, in normalised image space: x right and y down in `[0, 1]`, z
/// negative toward the sensor.  A hand within reach also stands in for the
/// face detector, since the controller has no camera image to offer.
#[cfg(feature = "leap")]
pub struct LeapFrameSource;

#[cfg(feature = "leap")]
impl FrameSource for LeapFrameSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(SourceEvent::Failed(SensorError::CameraUnavailable(format!("{:?}", e))));
                return;
            }
        };
        if let Err(e) = connection.open() {
            let _ = tx.send(SourceEvent::Failed(SensorError::CameraUnavailable(format!("{:?}", e))));
            return;
        }
        if tx.send(SourceEvent::Ready).is_err() {
            return;
        }

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<_> = frame.hands().collect();
                let mut out = DetectorFrame::default();
                if let Some(h) = hands.first() {
                    out.hands.push(leap_landmarks(h));
                    out.faces.push(FaceBox { x: 0.5, y: 0.5, width: 0.0, height: 0.0, score: 1.0 });
                }
                if tx.send(SourceEvent::Frame(out)).is_err() {
                    return;
                }
            }
        }
    }
}

/// LeapC millimetres → normalised image space.
#[cfg(feature = "leap")]
fn leap_point(x: f32, y: f32, z: f32) -> sensor_auth::Landmark {
    // Interaction box: ±200 mm across, 100–500 mm above the device.
    sensor_auth::Landmark::new(
        ((x + 200.0) / 400.0).clamp(0.0, 1.0),
        (1.0 - (y - 100.0) / 400.0).clamp(0.0, 1.0),
        -z / 400.0,
    )
}

#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::Hand) -> Vec<sensor_auth::Landmark> {
    let digits: Vec<_> = hand.digits().collect();
    let mut pts = Vec::with_capacity(sensor_auth::LANDMARK_COUNT);
    if digits.len() < 5 {
        return pts;
    }

    // Wrist: base of the middle metacarpal.
    let w = digits[2].metacarpal().prev_joint();
    pts.push(leap_point(w.x, w.y, w.z));

    for d in &digits {
        for j in [
            d.proximal().prev_joint(),
            d.intermediate().prev_joint(),
            d.distal().prev_joint(),
            d.distal().next_joint(),
        ] {
            pts.push(leap_point(j.x, j.y, j.z));
        }
    }
    pts
}

// ════════════════════════════════════════════════════════════════════════════
// SimFrameSource — keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
    /// A printable key, routed to the override buffer.
    Char(char),
}

/// Simulated controls (mapped from minifb keys in the visualizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    ToggleFace,     // F1
    ToggleHand,     // F2
    Fist,           // F3
    Palm,           // F4
    Victory,        // F5
    SayWakePhrase,  // F6
    Reach,          // F7: push the hand toward the sensor
    ToggleListen,   // F8
    Left,           // ←
    Right,          // →
    Up,             // ↑
    Down,           // ↓
    PinchIn,        // PageDown
    PinchOut,       // PageUp
    Quit,           // Escape
}

/// Pose the simulator is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    Palm,
    Fist,
    Victory,
}

impl SimPose {
    fn fingers(&self) -> [bool; 4] {
        match self {
            SimPose::Palm    => [true, true, true, true],
            SimPose::Fist    => [false, false, false, false],
            SimPose::Victory => [true, true, false, false],
        }
    }
}

/// The simulated scene: what the fake camera sees right now.
#[derive(Clone, Debug, PartialEq)]
pub struct SimRig {
    pub face: bool,
    pub hand: bool,
    pub pose: SimPose,
    pub cx: f32,
    pub cy: f32,
    pub z: f32,
    pub pinch: f32,
    pending_keys: Vec<KeyEvent>,
    pending_transcript: Option<String>,
}

impl Default for SimRig {
    fn default() -> Self {
        SimRig {
            face: false,
            hand: false,
            pose: SimPose::Palm,
            cx: 0.5,
            cy: 0.5,
            z: 0.0,
            pinch: 0.1,
            pending_keys: Vec::new(),
            pending_transcript: None,
        }
    }
}

impl SimRig {
    const STEP: f32 = 0.03;

    /// Apply one input.  Returns `false` on quit.
    pub fn apply(&mut self, input: &SimInput) -> bool {
        match input {
            SimInput::Char(c) => self.pending_keys.push(KeyEvent::Char(*c)),
            SimInput::KeyDown(k) => match k {
                SimKey::ToggleFace    => self.face = !self.face,
                SimKey::ToggleHand    => self.hand = !self.hand,
                SimKey::Fist          => { self.hand = true; self.pose = SimPose::Fist; }
                SimKey::Palm          => { self.hand = true; self.pose = SimPose::Palm; }
                SimKey::Victory       => { self.hand = true; self.pose = SimPose::Victory; }
                SimKey::SayWakePhrase => self.pending_transcript = Some("hello zeno".to_string()),
                SimKey::Reach         => self.z = if self.z < 0.0 { 0.0 } else { -0.2 },
                SimKey::Left          => self.cx = (self.cx - Self::STEP).clamp(0.0, 1.0),
                SimKey::Right         => self.cx = (self.cx + Self::STEP).clamp(0.0, 1.0),
                SimKey::Up            => self.cy = (self.cy - Self::STEP).clamp(0.0, 1.0),
                SimKey::Down          => self.cy = (self.cy + Self::STEP).clamp(0.0, 1.0),
                SimKey::PinchIn       => self.pinch = (self.pinch - 0.02).max(0.0),
                SimKey::PinchOut      => self.pinch = (self.pinch + 0.02).min(0.5),
                SimKey::ToggleListen  => {}
                SimKey::Quit          => return false,
            },
        }
        true
    }

    /// Snapshot the scene.  Keys and transcripts are delivered once.
    pub fn frame(&mut self) -> DetectorFrame {
        let mut out = DetectorFrame {
            keys: std::mem::take(&mut self.pending_keys),
            transcript: self.pending_transcript.take(),
            ..DetectorFrame::default()
        };
        if self.face {
            out.faces.push(FaceBox { x: 0.35, y: 0.25, width: 0.3, height: 0.4, score: 0.95 });
        }
        if self.hand {
            let h = synthetic_hand(self.cx, self.cy, self.z, self.pose.fingers(), self.pinch);
            out.hands.push(h.points().to_vec());
        }
        out
    }
}

/// Frame source driven by [`SimInput`] events from the visualizer's window.
///
/// Emits a frame every [`SIM_FRAME_INTERVAL`] and immediately after each
/// input, so typed keys are not held back by the frame clock.
pub struct SimFrameSource {
    pub rx: Receiver<SimInput>,
}

impl FrameSource for SimFrameSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let mut rig = SimRig::default();
        if tx.send(SourceEvent::Ready).is_err() {
            return;
        }
        loop {
            match self.rx.recv_timeout(SIM_FRAME_INTERVAL) {
                Ok(input) => {
                    if !rig.apply(&input) {
                        let _ = tx.send(SourceEvent::Quit);
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            if tx.send(SourceEvent::Frame(rig.frame())).is_err() {
                return;
            }
        }
    }
}
