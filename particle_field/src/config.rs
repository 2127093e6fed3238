//! Engine tuning.  Every field has a default, so a JSON override file only
//! needs the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shapes::DEFAULT_FIELD_EXTENT;
use crate::visual::VisualState;

/// Fraction of the remaining distance covered per nominal frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LerpSpeeds {
    pub boot: f32,
    pub auth_face: f32,
    pub idle: f32,
    pub action: f32,
}

impl Default for LerpSpeeds {
    fn default() -> Self {
        LerpSpeeds { boot: 0.02, auth_face: 0.15, idle: 0.08, action: 0.2 }
    }
}

impl LerpSpeeds {
    pub fn for_state(&self, s: VisualState) -> f32 {
        match s {
            VisualState::Boot     => self.boot,
            VisualState::AuthFace => self.auth_face,
            VisualState::Idle     => self.idle,
            VisualState::Action   => self.action,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub particle_count: usize,
    /// Seeds every per-index generator and the audio jitter.
    pub seed: u64,
    pub lerp: LerpSpeeds,

    // ── Explosion ────────────────────────────────────────────────────────────
    pub explosion_force: f32,
    /// Velocity multiplier per nominal frame.
    pub damping: f32,
    /// The burst ends once no particle moves faster than this.
    pub settle_speed: f32,

    /// Nominal frame length in seconds; per-frame rates are scaled by `dt / frame_dt`.
    pub frame_dt: f32,

    // ── Idle modulation ──────────────────────────────────────────────────────
    pub breathing_amplitude: f32,
    /// rad/s
    pub breathing_rate: f32,
    /// Jitter spread at amplitude 1.0.
    pub jitter_gain: f32,
    /// Per-particle sinusoidal wobble; 0 disables.
    pub wobble: f32,

    // ── Whole-field motion ───────────────────────────────────────────────────
    /// Radians about Y per nominal frame.
    pub spin_rate: f32,
    pub tilt_amplitude: f32,
    pub tilt_rate: f32,

    pub shape_debounce_ms: u64,
    /// World units per unit of hand offset.
    pub field_extent: f32,
    /// Pinch/position/fist drive expansion, spin and tint.
    pub hand_modulation: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            particle_count:      150_000,
            seed:                0x5EED,
            lerp:                LerpSpeeds::default(),
            explosion_force:     50.0,
            damping:             0.95,
            settle_speed:        0.05,
            frame_dt:            1.0 / 60.0,
            breathing_amplitude: 0.2,
            breathing_rate:      2.0,
            jitter_gain:         2.0,
            wobble:              0.0,
            spin_rate:           0.005,
            tilt_amplitude:      0.05,
            tilt_rate:           0.2,
            shape_debounce_ms:   1_500,
            field_extent:        DEFAULT_FIELD_EXTENT,
            hand_modulation:     false,
        }
    }
}

impl FieldConfig {
    /// The smaller, hand-sculpted field.
    pub fn compact() -> Self {
        FieldConfig {
            particle_count:  12_000,
            wobble:          0.1,
            spin_rate:       0.01,
            tilt_amplitude:  0.1,
            hand_modulation: true,
            ..FieldConfig::default()
        }
    }

    pub fn shape_debounce(&self) -> Duration {
        Duration::from_millis(self.shape_debounce_ms)
    }

    /// `frame_dt`, or the 60 Hz default if the configured value is unusable.
    pub fn nominal_frame(&self) -> f32 {
        if self.frame_dt.is_finite() && self.frame_dt > 0.0 {
            self.frame_dt
        } else {
            1.0 / 60.0
        }
    }
}
