//! Normalises raw detector output into a small signal vocabulary.
//!
//! Detectors (face boxes, hand skeletons, gesture labels, speech transcripts,
//! key events) arrive at whatever rate the camera and models manage.  The
//! adapter turns one [`DetectorFrame`] into a list of [`Signal`]s that the
//! auth state machine and the gesture pipeline understand.

use crate::gesture::{GestureClass, GestureClassifier, GestureSample, GestureUpdate, HandLandmarks, Landmark};

// ════════════════════════════════════════════════════════════════════════════
// Raw input
// ════════════════════════════════════════════════════════════════════════════

/// A face bounding box in normalised image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

/// Top-scoring recogniser label for a hand.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureLabel {
    pub category: String,
    pub score: f32,
}

/// Everything the detectors produced for one camera frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectorFrame {
    pub faces: Vec<FaceBox>,
    /// One landmark list per detected hand; only the first is used.
    pub hands: Vec<Vec<Landmark>>,
    /// Optional recogniser labels, parallel to `hands`.
    pub gesture_labels: Vec<GestureLabel>,
    /// A finished speech recognition result, if any arrived with this frame.
    pub transcript: Option<String>,
    /// Keystrokes received since the previous frame.
    pub keys: Vec<KeyEvent>,
}

/// A raw keyboard event as delivered by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    /// Named non-printing key (`"Shift"`, `"Enter"`, …).  Ignored.
    Named(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Signals
// ════════════════════════════════════════════════════════════════════════════

/// Normalised signal vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// A face was seen.  `biometric` marks the hand-proximity shortcut.
    FaceDetected { biometric: bool },
    /// Raw skeleton of the tracked hand, or `None` when no hand is present.
    HandLandmarks(Option<HandLandmarks>),
    /// Discrete pose of the tracked hand.
    GestureClass(GestureClass),
    /// A recognised speech transcript, lower-cased.
    VoicePhraseHeard(String),
    /// A printable keystroke for the override buffer.
    Key(char),
}

// ════════════════════════════════════════════════════════════════════════════
// SensorAdapter
// ════════════════════════════════════════════════════════════════════════════

/// Stateless frame → signal translator.
#[derive(Clone, Debug)]
pub struct SensorAdapter {
    classifier: GestureClassifier,
    /// Wrist depth below which a hand counts as a biometric presence.
    biometric_depth: Option<f32>,
    min_face_score: f32,
}

/// Result of adapting one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptedFrame {
    pub signals: Vec<Signal>,
    pub gesture: GestureUpdate,
}

impl SensorAdapter {
    pub fn new(classifier: GestureClassifier, biometric_depth: Option<f32>) -> Self {
        SensorAdapter { classifier, biometric_depth, min_face_score: 0.5 }
    }

    pub fn with_min_face_score(mut self, score: f32) -> Self {
        self.min_face_score = score;
        self
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn adapt(&self, frame: &DetectorFrame) -> AdaptedFrame {
        let mut signals = Vec::new();

        for key in &frame.keys {
            if let Some(c) = Self::adapt_key(key) {
                signals.push(Signal::Key(c));
            }
        }

        if frame.faces.iter().any(|f| f.score >= self.min_face_score) {
            signals.push(Signal::FaceDetected { biometric: false });
        }

        let hand = frame.hands.first().and_then(|pts| HandLandmarks::from_slice(pts));
        let gesture = self.classifier.classify_frame(hand.as_ref());

        if let (Some(h), Some(depth)) = (&hand, self.biometric_depth) {
            if h.get(crate::gesture::idx::WRIST).z < depth {
                signals.push(Signal::FaceDetected { biometric: true });
            }
        }

        let class = match (&gesture, frame.gesture_labels.first()) {
            (GestureUpdate::Hand(_), Some(label)) => GestureClass::from_label(&label.category),
            (GestureUpdate::Hand(s), None)        => s.class(),
            (GestureUpdate::Idle, _)              => GestureClass::None,
        };
        signals.push(Signal::HandLandmarks(hand));
        signals.push(Signal::GestureClass(class));

        if let Some(text) = &frame.transcript {
            signals.push(Signal::VoicePhraseHeard(text.to_lowercase()));
        }

        AdaptedFrame { signals, gesture }
    }

    /// Printable characters only; modifier and named keys are dropped.
    pub fn adapt_key(key: &KeyEvent) -> Option<char> {
        match key {
            KeyEvent::Char(c) if !c.is_control() => Some(*c),
            _ => None,
        }
    }
}

impl AdaptedFrame {
    pub fn sample(&self) -> Option<GestureSample> {
        match self.gesture {
            GestureUpdate::Hand(s) => Some(s),
            GestureUpdate::Idle    => None,
        }
    }
}
