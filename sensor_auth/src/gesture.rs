//! Hand gesture classification from a 21-point landmark skeleton.
//!
//! Landmarks follow the usual hand-tracking layout: 0 is the wrist, then four
//! points per finger from the base joint out to the tip (thumb 1–4, index
//! 5–8, middle 9–12, ring 13–16, pinky 17–20).  Coordinates are normalised
//! image space: `x`, `y` in `[0, 1]` with `y` growing **downward**, and `z`
//! a relative depth (negative = closer to the camera).
//!
//! A finger counts as "up" when its tip sits above its middle (PIP) joint.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Landmarks
// ════════════════════════════════════════════════════════════════════════════

/// Number of points in one hand skeleton.
pub const LANDMARK_COUNT: usize = 21;

/// Skeleton indices used by the classifier.
pub mod idx {
    pub const WRIST:      usize = 0;
    pub const THUMB_TIP:  usize = 4;
    pub const INDEX_PIP:  usize = 6;
    pub const INDEX_TIP:  usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP:   usize = 14;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_PIP:  usize = 18;
    pub const PINKY_TIP:  usize = 20;
}

/// A single tracked skeletal point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A complete, validated hand skeleton.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Build from detector output.
    ///
    /// Returns `None` for short skeletons or any non-finite coordinate, so a
    /// half-tracked hand becomes "no hand" instead of NaN downstream.
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        if points.len() < LANDMARK_COUNT {
            return None;
        }
        let mut out = [Landmark::default(); LANDMARK_COUNT];
        for (dst, src) in out.iter_mut().zip(points) {
            if !src.is_finite() {
                return None;
            }
            *dst = *src;
        }
        Some(HandLandmarks { points: out })
    }

    pub fn get(&self, i: usize) -> Landmark {
        self.points[i]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    fn tip_above(&self, tip: usize, pip: usize) -> bool {
        self.points[tip].y < self.points[pip].y
    }

    fn tip_below(&self, tip: usize, pip: usize) -> bool {
        self.points[tip].y > self.points[pip].y
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClass / GestureSample
// ════════════════════════════════════════════════════════════════════════════

/// Discrete hand pose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureClass {
    #[default]
    None,
    Fist,
    OpenPalm,
    Victory,
}

impl GestureClass {
    /// Wire name used in the bridge document's `active_gesture` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureClass::None     => "NONE",
            GestureClass::Fist     => "FIST",
            GestureClass::OpenPalm => "PALM",
            GestureClass::Victory  => "VICTORY",
        }
    }

    /// Map a recogniser category label.  Unknown labels are `None`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Closed_Fist" => GestureClass::Fist,
            "Open_Palm"   => GestureClass::OpenPalm,
            "Victory"     => GestureClass::Victory,
            _             => GestureClass::None,
        }
    }
}

/// Features derived from one detector frame.  Never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSample {
    /// Thumb tip ↔ index tip distance in the image plane.
    pub pinch_distance: f32,
    pub hand_x: f32,
    pub hand_y: f32,
    pub hand_z: f32,
    pub is_fist: bool,
    pub is_victory: bool,
    pub is_open_palm: bool,
}

impl GestureSample {
    pub fn class(&self) -> GestureClass {
        if self.is_fist {
            GestureClass::Fist
        } else if self.is_victory {
            GestureClass::Victory
        } else if self.is_open_palm {
            GestureClass::OpenPalm
        } else {
            GestureClass::None
        }
    }
}

/// Per-frame classifier output.
///
/// `Idle` is an explicit "no hand in this frame" so consumers can tell it
/// apart from "no frame processed yet".
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureUpdate {
    Idle,
    Hand(GestureSample),
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Which landmark stands in for "the hand" when reporting position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandAnchor {
    #[default]
    Wrist,
    MiddleMcp,
}

impl HandAnchor {
    fn index(&self) -> usize {
        match self {
            HandAnchor::Wrist     => idx::WRIST,
            HandAnchor::MiddleMcp => idx::MIDDLE_MCP,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GestureClassifier {
    pub anchor: HandAnchor,
}

impl GestureClassifier {
    pub fn new(anchor: HandAnchor) -> Self {
        GestureClassifier { anchor }
    }

    pub fn classify(&self, hand: &HandLandmarks) -> GestureSample {
        use idx::*;

        let thumb = hand.get(THUMB_TIP);
        let index = hand.get(INDEX_TIP);
        let dx = thumb.x - index.x;
        let dy = thumb.y - index.y;
        let pinch_distance = (dx * dx + dy * dy).sqrt();

        let index_up   = hand.tip_above(INDEX_TIP,  INDEX_PIP);
        let middle_up  = hand.tip_above(MIDDLE_TIP, MIDDLE_PIP);
        let ring_down  = hand.tip_below(RING_TIP,   RING_PIP);
        let pinky_down = hand.tip_below(PINKY_TIP,  PINKY_PIP);
        let ring_up    = hand.tip_above(RING_TIP,   RING_PIP);
        let pinky_up   = hand.tip_above(PINKY_TIP,  PINKY_PIP);

        let anchor = hand.get(self.anchor.index());

        GestureSample {
            pinch_distance,
            hand_x: anchor.x,
            hand_y: anchor.y,
            hand_z: anchor.z,
            is_fist:      !index_up && !middle_up && ring_down && pinky_down,
            is_victory:   index_up && middle_up && ring_down && pinky_down,
            is_open_palm: index_up && middle_up && ring_up && pinky_up,
        }
    }

    /// Classify one frame's worth of detector output.
    pub fn classify_frame(&self, hand: Option<&HandLandmarks>) -> GestureUpdate {
        match hand {
            Some(h) => GestureUpdate::Hand(self.classify(h)),
            None    => GestureUpdate::Idle,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic skeletons (tests and the keyboard simulator)
// ════════════════════════════════════════════════════════════════════════════

/// Build a plausible skeleton centred on `(cx, cy)` with each finger either
/// raised or curled.  Order: `[index, middle, ring, pinky]`.
pub fn synthetic_hand(cx: f32, cy: f32, z: f32, fingers_up: [bool; 4], pinch: f32) -> HandLandmarks {
    let mut pts = [Landmark::new(cx, cy, z); LANDMARK_COUNT];
    pts[idx::WRIST] = Landmark::new(cx, cy + 0.15, z);

    // Thumb: base → tip, tip placed `pinch` away from the index tip.
    for (k, p) in pts[1..=4].iter_mut().enumerate() {
        *p = Landmark::new(cx - 0.03 * (k as f32 + 1.0), cy + 0.08, z);
    }

    for (f, &up) in fingers_up.iter().enumerate() {
        let base = 5 + f * 4;
        let fx = cx - 0.03 + 0.02 * f as f32;
        // MCP, PIP, DIP, TIP; raised fingers extend upward (smaller y).
        let ys: [f32; 4] = if up {
            [cy, cy - 0.04, cy - 0.07, cy - 0.10]
        } else {
            [cy, cy - 0.02, cy + 0.01, cy + 0.03]
        };
        for (j, y) in ys.iter().enumerate() {
            pts[base + j] = Landmark::new(fx, *y, z);
        }
    }

    let it = pts[idx::INDEX_TIP];
    pts[idx::THUMB_TIP] = Landmark::new(it.x - pinch, it.y, z);

    // Every slot is finite by construction.
    HandLandmarks { points: pts }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
