//! The particle field.
//!
//! The engine owns four parallel buffers (position, color, velocity, target)
//! and moves them forward one frame per [`ParticleFieldEngine::step`]:
//!
//! ```text
//!   state / shape change ──► recompute every target (O(N), once)
//!   each frame:
//!     exploding?  pos += vel·dt ; vel *= damping      (until settled → IDLE)
//!     otherwise   pos += (effective_target − pos)·k   (k from the state's lerp speed)
//!     effective_target = target · breathing · expansion + audio jitter   (IDLE)
//!                      = stream toward the live hand + ripple            (ACTION)
//!     whole field: spin about Y, slow tilt about Z
//! ```

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use bridge_doc::{BridgeDocument, HandPos, SessionStatus};
use sensor_auth::{CoreEvent, GestureUpdate};

use crate::color::{hsl_to_rgb, MASK_BLUE, NEON_CYAN};
use crate::config::FieldConfig;
use crate::math::Vec3;
use crate::shapes::{self, Shape, ShapeParams, CYCLE};
use crate::visual::VisualState;

/// One particle, copied out of the engine's buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleRecord {
    pub position: Vec3,
    pub color: Vec3,
    pub velocity: Vec3,
    pub target: Vec3,
}

/// What a renderer needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FieldFrame<'a> {
    pub positions: &'a [Vec3],
    pub colors: &'a [Vec3],
    pub rot_y: f32,
    pub rot_z: f32,
    pub state: VisualState,
    pub shape: Shape,
}

pub trait FieldRenderer {
    fn render(&mut self, frame: &FieldFrame<'_>);
}

/// Hand-driven scale, spin and tint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandModulation {
    pub expansion: f32,
    pub spin: f32,
    /// Hue in turns; `None` keeps the state's own palette.
    pub hue: Option<f32>,
}

impl Default for HandModulation {
    fn default() -> Self {
        HandModulation { expansion: 1.0, spin: 0.2, hue: None }
    }
}

const IDLE_EASE: f32 = 0.05;

fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

/// Image-space hand (x right, y down, both in `[0, 1]`) to field space
/// (centered, y up, roughly `[-1, 1]`).
pub fn hand_to_field(p: HandPos) -> Option<Vec3> {
    if !p.is_finite() {
        return None;
    }
    Some(Vec3::new((p.x - 0.5) * 2.0, (0.5 - p.y) * 2.0, -p.z))
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleFieldEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct ParticleFieldEngine {
    cfg: FieldConfig,
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    base_colors: Vec<Vec3>,
    velocities: Vec<Vec3>,
    targets: Vec<Vec3>,

    state: VisualState,
    shape_index: usize,
    time: f32,
    exploding: bool,
    hand: Option<Vec3>,
    amplitude: f32,
    modulation: HandModulation,
    rot_y: f32,
    rot_z: f32,

    retargets: u64,
    last_shape_advance: Option<Instant>,
    jitter: SmallRng,
}

impl ParticleFieldEngine {
    /// Starts in `Boot` with targets computed and particles already on them.
    pub fn new(cfg: FieldConfig) -> Self {
        let n = cfg.particle_count;
        let jitter = SmallRng::seed_from_u64(cfg.seed.wrapping_add(1));
        let mut engine = ParticleFieldEngine {
            positions: vec![Vec3::ZERO; n],
            colors: vec![NEON_CYAN; n],
            base_colors: vec![NEON_CYAN; n],
            velocities: vec![Vec3::ZERO; n],
            targets: vec![Vec3::ZERO; n],
            state: VisualState::Boot,
            shape_index: 0,
            time: 0.0,
            exploding: false,
            hand: None,
            amplitude: 0.0,
            modulation: HandModulation::default(),
            rot_y: 0.0,
            rot_z: 0.0,
            retargets: 0,
            last_shape_advance: None,
            jitter,
            cfg,
        };
        engine.retarget();
        engine.positions.copy_from_slice(&engine.targets);
        engine.colors.copy_from_slice(&engine.base_colors);
        engine
    }

    pub fn config(&self) -> &FieldConfig {
        &self.cfg
    }

    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }

    pub fn state(&self) -> VisualState {
        self.state
    }

    pub fn shape(&self) -> Shape {
        CYCLE[self.shape_index]
    }

    /// How many times the full target array has been recomputed.
    pub fn retarget_count(&self) -> u64 {
        self.retargets
    }

    pub fn is_exploding(&self) -> bool {
        self.exploding
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn hand(&self) -> Option<Vec3> {
        self.hand
    }

    pub fn modulation(&self) -> HandModulation {
        self.modulation
    }

    pub fn rotation(&self) -> (f32, f32) {
        (self.rot_y, self.rot_z)
    }

    pub fn particle(&self, i: usize) -> Option<ParticleRecord> {
        Some(ParticleRecord {
            position: *self.positions.get(i)?,
            color: self.colors[i],
            velocity: self.velocities[i],
            target: self.targets[i],
        })
    }

    pub fn frame(&self) -> FieldFrame<'_> {
        FieldFrame {
            positions: &self.positions,
            colors: &self.colors,
            rot_y: self.rot_y,
            rot_z: self.rot_z,
            state: self.state,
            shape: self.shape(),
        }
    }

    pub fn render(&self, renderer: &mut dyn FieldRenderer) {
        renderer.render(&self.frame());
    }

    // ── inputs ───────────────────────────────────────────────────────────────

    /// Switch visual state.  Targets are recomputed only on an actual change.
    pub fn set_state(&mut self, s: VisualState) -> bool {
        if s == self.state {
            return false;
        }
        debug!(from = self.state.as_str(), to = s.as_str(), "visual state");
        self.state = s;
        self.retarget();
        true
    }

    pub fn apply_status(&mut self, status: SessionStatus) -> bool {
        self.set_state(VisualState::from_status(status))
    }

    /// Apply whatever a bridge poll found.  Absent fields leave things as
    /// they are, except the hand: no usable `hand_pos`, or an active gesture
    /// of `NONE`, means no hand is tracked.
    pub fn apply_document(&mut self, doc: &BridgeDocument) -> bool {
        let lost = doc.active_gesture.as_deref() == Some("NONE");
        self.set_hand(if lost { None } else { doc.hand() });
        if let Some(a) = doc.amplitude() {
            self.set_amplitude(a);
        }
        match doc.status {
            Some(s) => self.apply_status(s),
            None => false,
        }
    }

    pub fn set_hand(&mut self, hand: Option<HandPos>) {
        self.hand = hand.and_then(hand_to_field);
    }

    /// Non-finite input reads as silence.
    pub fn set_amplitude(&mut self, a: f32) {
        self.amplitude = if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Move to the next shape in [`CYCLE`].
    pub fn next_shape(&mut self) -> Shape {
        self.shape_index = (self.shape_index + 1) % CYCLE.len();
        self.modulation.hue = None;
        debug!(shape = self.shape().name(), "shape advance");
        if self.state == VisualState::Idle {
            self.retarget();
        }
        self.shape()
    }

    /// Feed one classifier update.  Returns `true` if the shape advanced.
    pub fn apply_gesture(&mut self, update: &GestureUpdate, now: Instant) -> bool {
        let sample = match update {
            GestureUpdate::Idle => {
                self.hand = None;
                if self.cfg.hand_modulation {
                    let m = &mut self.modulation;
                    m.expansion += (1.0 - m.expansion) * IDLE_EASE;
                    m.spin += (0.2 - m.spin) * IDLE_EASE;
                }
                return false;
            }
            GestureUpdate::Hand(s) => s,
        };
        self.set_hand(Some(HandPos::new(sample.hand_x, sample.hand_y, sample.hand_z)));

        if self.cfg.hand_modulation {
            let m = &mut self.modulation;
            if sample.pinch_distance.is_finite() {
                m.expansion = map_linear(sample.pinch_distance, 0.05, 0.4, 0.5, 3.0).clamp(0.1, 4.0);
            }
            if sample.hand_x.is_finite() {
                m.spin = (sample.hand_x - 0.5) * 4.0;
            }
            if sample.hand_y.is_finite() {
                m.hue = Some(sample.hand_y);
            }
            if sample.is_fist {
                m.expansion = 0.1;
            }
        }

        if sample.is_victory {
            let ready = self
                .last_shape_advance
                .map_or(true, |t| now.saturating_duration_since(t) >= self.cfg.shape_debounce());
            if ready {
                self.last_shape_advance = Some(now);
                self.next_shape();
                return true;
            }
        }
        false
    }

    /// Bus hook: auth success bursts the field, gesture updates go to
    /// [`apply_gesture`](Self::apply_gesture).
    pub fn on_event(&mut self, event: &CoreEvent, now: Instant) {
        match event {
            CoreEvent::AuthSuccess { .. } => self.trigger_explosion(),
            CoreEvent::GestureUpdate(u)   => { self.apply_gesture(u, now); }
            CoreEvent::StateChanged { .. } => {}
        }
    }

    /// Outward burst from the current positions.  A second trigger while one
    /// is running replaces the velocities.
    pub fn trigger_explosion(&mut self) {
        let force = self.cfg.explosion_force;
        for (v, p) in self.velocities.iter_mut().zip(&self.positions) {
            *v = p.normalize_or_zero() * force;
        }
        self.exploding = true;
        debug!(force, "explosion start");
    }

    // ── per frame ────────────────────────────────────────────────────────────

    pub fn step(&mut self, dt: f32) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let frames = dt / self.cfg.nominal_frame();
        self.time += dt;

        if self.exploding {
            self.step_explosion(dt, frames);
        } else {
            self.step_ease(frames);
        }
        self.update_colors();

        let spin = if self.cfg.hand_modulation {
            self.cfg.spin_rate + self.modulation.spin * 0.05
        } else {
            self.cfg.spin_rate
        };
        self.rot_y += spin * frames;
        self.rot_z = (self.time * self.cfg.tilt_rate).sin() * self.cfg.tilt_amplitude;
    }

    fn step_explosion(&mut self, dt: f32, frames: f32) {
        let damp = self.cfg.damping.powf(frames);
        let mut peak = 0.0_f32;
        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            *p += *v * dt;
            *v *= damp;
            peak = peak.max(v.length());
        }
        if peak < self.cfg.settle_speed {
            self.velocities.fill(Vec3::ZERO);
            self.exploding = false;
            debug!(t = self.time, "explosion settled");
            // A state applied during the burst stands.
            if matches!(self.state, VisualState::Boot | VisualState::AuthFace) {
                self.set_state(VisualState::Idle);
            }
        }
    }

    fn step_ease(&mut self, frames: f32) {
        let lerp = self.cfg.lerp.for_state(self.state).clamp(0.0, 1.0);
        let k = 1.0 - (1.0 - lerp).powf(frames);
        let n = self.positions.len();
        let t = self.time;

        match self.state {
            VisualState::Boot | VisualState::AuthFace => {
                for (p, tgt) in self.positions.iter_mut().zip(&self.targets) {
                    *p += (*tgt - *p) * k;
                }
            }
            VisualState::Idle => {
                let expansion = if self.cfg.hand_modulation { self.modulation.expansion } else { 1.0 };
                let pulse = (t * self.cfg.breathing_rate).sin() * self.cfg.breathing_amplitude + 1.0;
                let scale = pulse * expansion;
                let spread = self.amplitude * self.cfg.jitter_gain;
                let wobble = self.cfg.wobble * expansion;
                for i in 0..n {
                    let mut tgt = self.targets[i] * scale;
                    if spread > 0.0 {
                        tgt += Vec3::new(
                            self.jitter.gen::<f32>() - 0.5,
                            self.jitter.gen::<f32>() - 0.5,
                            self.jitter.gen::<f32>() - 0.5,
                        ) * spread;
                    }
                    if wobble > 0.0 {
                        tgt.x += (t * 2.0 + i as f32).sin() * wobble;
                        tgt.y += (t * 1.5 + i as f32).cos() * wobble;
                    }
                    let p = &mut self.positions[i];
                    *p += (tgt - *p) * k;
                }
            }
            VisualState::Action => {
                let extent = self.cfg.field_extent;
                for i in 0..n {
                    let tgt = shapes::stream_to_hand(i, n, self.hand, extent, t);
                    let p = &mut self.positions[i];
                    *p += (tgt - *p) * k;
                }
            }
        }
    }

    fn update_colors(&mut self) {
        let tint = match self.state {
            VisualState::Idle if self.amplitude > 0.0 => {
                let b = 0.5 + self.amplitude * 0.5;
                Some(Vec3::new(0.0, b, b))
            }
            VisualState::Idle | VisualState::Action => self.modulation.hue.map(|h| hsl_to_rgb(h, 1.0, 0.5)),
            _ => None,
        };
        match tint {
            Some(c) => self.colors.fill(c),
            None => self.colors.copy_from_slice(&self.base_colors),
        }
    }

    /// Recompute every target (and base color) for the current state.
    fn retarget(&mut self) {
        let n = self.targets.len();
        let params = ShapeParams {
            seed: self.cfg.seed,
            hand: self.hand,
            extent: self.cfg.field_extent,
            time: self.time,
        };
        let (shape, color) = match self.state {
            VisualState::Boot     => (Shape::Scatter, None),
            VisualState::AuthFace => (Shape::FaceMask, Some(MASK_BLUE)),
            VisualState::Idle     => (self.shape(), Some(NEON_CYAN)),
            VisualState::Action   => (Shape::Stream, Some(NEON_CYAN)),
        };
        let gen = shape.descriptor().generate;
        for (i, t) in self.targets.iter_mut().enumerate() {
            *t = gen(i, n, &params);
        }
        match color {
            Some(c) => self.base_colors.fill(c),
            None => {
                for (i, c) in self.base_colors.iter_mut().enumerate() {
                    *c = shapes::scatter_color(i, n, self.cfg.seed);
                }
            }
        }
        self.retargets += 1;
        debug!(state = self.state.as_str(), shape = shape.name(), n, "targets recomputed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_auth::{AuthMethod, GestureSample};
    use std::time::Duration;

    fn small() -> FieldConfig {
        FieldConfig { particle_count: 2_000, ..Default::default() }
    }

    fn hand(pinch: f32, x: f32, y: f32, fist: bool, victory: bool) -> GestureUpdate {
        GestureUpdate::Hand(GestureSample {
            pinch_distance: pinch,
            hand_x: x,
            hand_y: y,
            hand_z: 0.0,
            is_fist: fist,
            is_victory: victory,
            is_open_palm: false,
        })
    }

    #[test]
    fn starts_in_boot_on_target() {
        let e = ParticleFieldEngine::new(small());
        assert_eq!(e.state(), VisualState::Boot);
        assert_eq!(e.retarget_count(), 1);
        let p = e.particle(5).unwrap();
        assert_eq!(p.position, p.target);
        assert!(e.particle(2_000).is_none());
    }

    #[test]
    fn status_sequence_retargets_once_per_transition() {
        let mut e = ParticleFieldEngine::new(small());
        let mut seen = vec![];
        let mut counts = vec![];
        for s in [SessionStatus::Initializing, SessionStatus::AuthPending, SessionStatus::Online] {
            e.apply_status(s);
            seen.push(e.state());
            counts.push(e.retarget_count());
        }
        assert_eq!(seen, vec![VisualState::Boot, VisualState::AuthFace, VisualState::Idle]);
        assert_eq!(counts, vec![1, 2, 3]);

        // Repeating a status is free.
        e.apply_status(SessionStatus::Online);
        assert_eq!(e.retarget_count(), 3);
        assert_eq!(e.particle(10).unwrap().target, shapes::sphere(10, 2_000));
    }

    #[test]
    fn unknown_status_falls_back_to_boot() {
        let mut e = ParticleFieldEngine::new(small());
        e.apply_status(SessionStatus::Online);
        e.apply_status(SessionStatus::Unknown);
        assert_eq!(e.state(), VisualState::Boot);
    }

    #[test]
    fn ease_moves_by_lerp_speed() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::AuthFace);
        let before = e.particle(3).unwrap();
        e.step(e.config().frame_dt);
        let after = e.particle(3).unwrap();
        let expected = before.position + (before.target - before.position) * 0.15;
        assert!((after.position - expected).length() < 1e-3);
    }

    #[test]
    fn explosion_is_radial_and_overwrites() {
        let mut e = ParticleFieldEngine::new(small());
        e.positions[0] = Vec3::ZERO;
        e.trigger_explosion();
        e.trigger_explosion();
        assert!(e.is_exploding());
        assert_eq!(e.particle(0).unwrap().velocity, Vec3::ZERO);
        let p = e.particle(1).unwrap();
        assert!((p.velocity.length() - 50.0).abs() < 1e-3);
        let dir = p.position.normalize_or_zero();
        assert!((p.velocity.normalize_or_zero() - dir).length() < 1e-4);
    }

    #[test]
    fn explosion_settles_into_idle() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::AuthFace);
        e.on_event(&CoreEvent::AuthSuccess { method: AuthMethod::Face }, Instant::now());
        let dt = e.config().frame_dt;
        let mut frames = 0;
        while e.is_exploding() && frames < 1_000 {
            e.step(dt);
            frames += 1;
        }
        assert!(!e.is_exploding());
        assert!(frames > 10);
        assert_eq!(e.state(), VisualState::Idle);
        assert!(e.velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn victory_is_debounced() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::Idle);
        let t0 = Instant::now();
        let v = hand(0.1, 0.5, 0.5, false, true);
        assert!(e.apply_gesture(&v, t0));
        assert!(!e.apply_gesture(&v, t0 + Duration::from_millis(1_000)));
        assert_eq!(e.shape(), Shape::Heart);
        assert!(e.apply_gesture(&v, t0 + Duration::from_millis(1_600)));
        assert_eq!(e.shape(), Shape::Saturn);
    }

    #[test]
    fn shape_change_retargets_only_when_visible() {
        let mut e = ParticleFieldEngine::new(small());
        let r0 = e.retarget_count();
        e.next_shape();
        assert_eq!(e.retarget_count(), r0);
        e.set_state(VisualState::Idle);
        let r1 = e.retarget_count();
        e.next_shape();
        assert_eq!(e.retarget_count(), r1 + 1);
    }

    #[test]
    fn stream_without_hand_stays_finite() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::Action);
        e.set_hand(Some(HandPos::new(f32::NAN, 0.2, 0.0)));
        assert!(e.hand().is_none());
        for _ in 0..30 {
            e.step(1.0 / 60.0);
        }
        assert!(e.frame().positions.iter().all(Vec3::is_finite));
    }

    #[test]
    fn silence_means_no_jitter() {
        let mut a = ParticleFieldEngine::new(small());
        let mut b = ParticleFieldEngine::new(small());
        for e in [&mut a, &mut b] {
            e.set_state(VisualState::Idle);
            e.set_amplitude(f32::NAN);
            e.step(1.0 / 60.0);
        }
        assert_eq!(a.amplitude(), 0.0);
        assert_eq!(a.frame().positions, b.frame().positions);
        assert_eq!(a.particle(0).unwrap().color, NEON_CYAN);
    }

    #[test]
    fn voice_brightens_idle() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::Idle);
        e.set_amplitude(0.6);
        e.step(1.0 / 60.0);
        let c = e.particle(0).unwrap().color;
        assert!((c.y - 0.8).abs() < 1e-6 && c.x == 0.0);
    }

    #[test]
    fn hand_modulation() {
        let mut e = ParticleFieldEngine::new(FieldConfig { particle_count: 500, ..FieldConfig::compact() });
        let now = Instant::now();
        e.apply_gesture(&hand(0.4, 0.75, 0.3, false, false), now);
        let m = e.modulation();
        assert!((m.expansion - 3.0).abs() < 1e-5);
        assert!((m.spin - 1.0).abs() < 1e-5);
        assert_eq!(m.hue, Some(0.3));

        e.apply_gesture(&hand(0.4, 0.5, 0.5, true, false), now);
        assert_eq!(e.modulation().expansion, 0.1);

        e.apply_gesture(&GestureUpdate::Idle, now);
        assert!((e.modulation().expansion - (0.1 + 0.9 * 0.05)).abs() < 1e-5);
    }

    #[test]
    fn modulation_ignored_when_disabled() {
        let mut e = ParticleFieldEngine::new(small());
        e.apply_gesture(&hand(0.4, 0.9, 0.3, true, false), Instant::now());
        assert_eq!(e.modulation(), HandModulation::default());
    }

    #[test]
    fn field_rotates_and_tilts() {
        let mut e = ParticleFieldEngine::new(small());
        for _ in 0..60 {
            e.step(1.0 / 60.0);
        }
        let (ry, rz) = e.rotation();
        assert!((ry - 0.3).abs() < 1e-3);
        assert!(rz.abs() <= 0.05 + 1e-6 && rz != 0.0);
    }

    #[test]
    fn document_drives_state_and_telemetry() {
        let mut e = ParticleFieldEngine::new(small());
        let doc = BridgeDocument::parse(
            r#"{"status":"LISTENING","hand_pos":{"x":1.0,"y":0.0,"z":0.0},"voice_amplitude":0.4}"#,
        )
        .unwrap();
        assert!(e.apply_document(&doc));
        assert_eq!(e.state(), VisualState::Action);
        assert_eq!(e.hand(), Some(Vec3::new(1.0, 1.0, 0.0)));
        assert!((e.amplitude() - 0.4).abs() < 1e-6);
        assert!(!e.apply_document(&BridgeDocument::default()));
        assert_eq!(e.state(), VisualState::Action);
        assert_eq!(e.hand(), None);
    }

    #[test]
    fn lost_hand_streams_to_origin() {
        let mut e = ParticleFieldEngine::new(small());
        let tracked = BridgeDocument::parse(
            r#"{"status":"LISTENING","hand_pos":{"x":0.9,"y":0.35,"z":0.0},"active_gesture":"PALM"}"#,
        )
        .unwrap();
        e.apply_document(&tracked);
        assert!(e.hand().is_some());

        // Stale coordinates next to NONE do not count.
        let gone = BridgeDocument::parse(
            r#"{"status":"LISTENING","hand_pos":{"x":0.9,"y":0.35,"z":0.0},"active_gesture":"NONE"}"#,
        )
        .unwrap();
        e.apply_document(&gone);
        assert_eq!(e.hand(), None);

        e.apply_gesture(&hand(0.1, 0.9, 0.35, false, false), Instant::now());
        assert!(e.hand().is_some());
        e.apply_gesture(&GestureUpdate::Idle, Instant::now());
        assert_eq!(e.hand(), None);

        let n = e.particle_count();
        let end = shapes::stream_to_hand(n - 1, n, e.hand(), e.config().field_extent, e.time());
        assert!(end.length() < 1.0);
    }

    #[test]
    fn settling_keeps_a_state_set_mid_burst() {
        let mut e = ParticleFieldEngine::new(small());
        e.set_state(VisualState::AuthFace);
        e.trigger_explosion();
        e.set_state(VisualState::Action);
        let dt = e.config().frame_dt;
        for _ in 0..1_000 {
            if !e.is_exploding() {
                break;
            }
            e.step(dt);
        }
        assert!(!e.is_exploding());
        assert_eq!(e.state(), VisualState::Action);
    }

    struct Counting(usize);
    impl FieldRenderer for Counting {
        fn render(&mut self, frame: &FieldFrame<'_>) {
            self.0 += frame.positions.len();
        }
    }

    #[test]
    fn render_submits_whole_buffer() {
        let e = ParticleFieldEngine::new(small());
        let mut r = Counting(0);
        e.render(&mut r);
        assert_eq!(r.0, 2_000);
    }
}
