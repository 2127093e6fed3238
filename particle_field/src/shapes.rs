//! Shape generators.
//!
//! Every generator maps `(index, count, params) → position` and is a pure
//! function of its arguments: where a shape wants randomness (the heart's
//! depth band, the torus angles, the boot scatter) it draws from a small RNG
//! seeded by `(params.seed, index mod count)`, so the same index always lands
//! in the same place and regenerating a target array is reproducible.
//!
//! | Shape | Used for | Extent |
//! |---|---|---|
//! | Sphere | idle (first in the cycle) | r = 10 |
//! | Heart | cycle | ≈ 13 × 14 |
//! | Saturn | cycle | sphere r = 10, ring 14‥22 |
//! | Flower | cycle | r ≤ 12 |
//! | Torus | cycle | R = 10, r = 4 |
//! | FaceMask | sign-in pending | ≈ 8 × 12 |
//! | Stream | listening | origin → hand × extent |
//! | Scatter | boot | ±100 cube |

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::math::Vec3;

pub const SPHERE_RADIUS: f32 = 10.0;
pub const DEFAULT_FIELD_EXTENT: f32 = 30.0;

/// Inputs shared by all generators.  Only `Stream` reads `hand`, `extent`
/// and `time`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeParams {
    pub seed: u64,
    /// Hand position in field coordinates (roughly `[-1, 1]` per axis).
    pub hand: Option<Vec3>,
    pub extent: f32,
    /// Seconds since the engine started.
    pub time: f32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        ShapeParams { seed: 0, hand: None, extent: DEFAULT_FIELD_EXTENT, time: 0.0 }
    }
}

pub type GeneratorFn = fn(usize, usize, &ShapeParams) -> Vec3;

/// A named generator.
#[derive(Clone, Copy)]
pub struct ShapeDescriptor {
    pub name: &'static str,
    pub generate: GeneratorFn,
}

impl std::fmt::Debug for ShapeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeDescriptor").field("name", &self.name).finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Sphere,
    Heart,
    Saturn,
    Flower,
    Torus,
    FaceMask,
    Stream,
    Scatter,
}

/// The Victory gesture walks this list, wrapping at the end.
pub const CYCLE: [Shape; 5] = [Shape::Sphere, Shape::Heart, Shape::Saturn, Shape::Flower, Shape::Torus];

impl Shape {
    pub fn descriptor(&self) -> ShapeDescriptor {
        let (name, generate): (&'static str, GeneratorFn) = match self {
            Shape::Sphere   => ("Sphere",   sphere_shape),
            Shape::Heart    => ("Heart",    heart),
            Shape::Saturn   => ("Saturn",   saturn),
            Shape::Flower   => ("Flower",   flower),
            Shape::Torus    => ("Torus",    torus),
            Shape::FaceMask => ("FaceMask", face_mask),
            Shape::Stream   => ("Stream",   stream_shape),
            Shape::Scatter  => ("Scatter",  scatter),
        };
        ShapeDescriptor { name, generate }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn generate(&self, i: usize, n: usize, params: &ShapeParams) -> Vec3 {
        (self.descriptor().generate)(i, n, params)
    }

    /// Case-insensitive lookup.  Unknown names fall back to `Scatter`, the
    /// boot shape.
    pub fn by_name(name: &str) -> Shape {
        const ALL: [Shape; 8] = [
            Shape::Sphere, Shape::Heart, Shape::Saturn, Shape::Flower,
            Shape::Torus, Shape::FaceMask, Shape::Stream, Shape::Scatter,
        ];
        ALL.iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Shape::Scatter)
    }

    /// Position of this shape in [`CYCLE`], if it is part of it.
    pub fn cycle_index(&self) -> Option<usize> {
        CYCLE.iter().position(|s| s == self)
    }
}

/// Per-index RNG.  Indices are wrapped so `i` and `i + n` draw the same numbers.
fn index_rng(seed: u64, i: usize, n: usize) -> SmallRng {
    let k = (i % n.max(1)) as u64;
    SmallRng::seed_from_u64(seed ^ k.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn centered(rng: &mut SmallRng) -> f64 {
    rng.gen::<f64>() - 0.5
}

fn v(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x as f32, y as f32, z as f32)
}

// ════════════════════════════════════════════════════════════════════════════
// Cycle shapes
// ════════════════════════════════════════════════════════════════════════════

/// Fibonacci-lattice sphere of radius [`SPHERE_RADIUS`].
pub fn sphere(i: usize, n: usize) -> Vec3 {
    let n = n.max(1);
    let i = i % n;
    let phi = (-1.0 + 2.0 * i as f64 / n as f64).clamp(-1.0, 1.0).acos();
    let theta = (n as f64 * PI).sqrt() * phi;
    let r = SPHERE_RADIUS as f64;
    v(r * theta.cos() * phi.sin(), r * theta.sin() * phi.sin(), r * phi.cos())
}

fn sphere_shape(i: usize, n: usize, _: &ShapeParams) -> Vec3 {
    sphere(i, n)
}

pub fn heart(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    let n = n.max(1);
    let t = (i % n) as f64 / n as f64 * 2.0 * PI;
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
    let z = centered(&mut index_rng(p.seed, i, n)) * 5.0;
    v(x * 0.8, y * 0.8, z)
}

/// The first 30 % of indices form a complete sphere; the rest a flat ring.
pub fn saturn(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    let n = n.max(1);
    let i = i % n;
    let n_sphere = ((n as f64 * 0.3).ceil() as usize).max(1);
    if i < n_sphere {
        return sphere(i, n_sphere);
    }
    let mut rng = index_rng(p.seed, i, n);
    let angle = rng.gen::<f64>() * 2.0 * PI;
    let distance = 14.0 + rng.gen::<f64>() * 8.0;
    let y = centered(&mut rng);
    v(angle.cos() * distance, y, angle.sin() * distance)
}

/// Four-petal rose radius swept over random spherical angles.
pub fn flower(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    const K: f64 = 4.0;
    let mut rng = index_rng(p.seed, i, n);
    let theta = rng.gen::<f64>() * 2.0 * PI;
    let phi = rng.gen::<f64>() * PI;
    let r = 12.0 * (K * theta).cos();
    v(r * phi.sin() * theta.cos(), r * phi.cos(), r * phi.sin() * theta.sin())
}

pub fn torus(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    const R: f64 = 10.0;
    const TUBE: f64 = 4.0;
    let mut rng = index_rng(p.seed, i, n);
    let u = rng.gen::<f64>() * 2.0 * PI;
    let w = rng.gen::<f64>() * 2.0 * PI;
    v((R + TUBE * w.cos()) * u.cos(), (R + TUBE * w.cos()) * u.sin(), TUBE * w.sin())
}

// ════════════════════════════════════════════════════════════════════════════
// State shapes
// ════════════════════════════════════════════════════════════════════════════

/// Elliptical sweep with a three-lobed radius.  The first 100 of every 1000
/// indices are pulled inward for the eye sockets.
pub fn face_mask(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    let n = n.max(1);
    let angle = (i % n) as f64 / n as f64 * 2.0 * PI;
    let radius = 8.0 + (angle * 3.0).sin() * 2.0;
    let mut x = angle.cos() * radius * 0.8;
    let mut y = angle.sin() * radius * 1.2;
    let z = centered(&mut index_rng(p.seed, i, n)) * 3.0;
    if i % 1000 < 100 {
        x *= 0.7;
        y *= 0.7;
    }
    v(x, y, z)
}

/// Sideways ripple along the stream: `(dx, dy)` for a particle at
/// `progress ∈ [0, 1)` at time `t`.
pub fn stream_turbulence(progress: f32, t: f32) -> (f32, f32) {
    let s = (progress * std::f32::consts::PI * 10.0 + t * 2.0).sin() * 0.5;
    (s, s * 0.5)
}

/// Particles spaced from the origin out to `hand × extent`.  With no hand
/// the stream collapses onto the origin (plus the ripple).
pub fn stream_to_hand(i: usize, n: usize, hand: Option<Vec3>, extent: f32, t: f32) -> Vec3 {
    let n = n.max(1);
    let progress = (i % n) as f32 / n as f32;
    let end = hand.filter(Vec3::is_finite).map(|h| h * extent).unwrap_or(Vec3::ZERO);
    let mut p = Vec3::lerp(Vec3::ZERO, end, progress);
    let (dx, dy) = stream_turbulence(progress, t);
    p.x += dx;
    p.y += dy;
    p
}

fn stream_shape(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    stream_to_hand(i, n, p.hand, p.extent, p.time)
}

/// Boot static: uniform in a 200-unit cube.
pub fn scatter(i: usize, n: usize, p: &ShapeParams) -> Vec3 {
    let mut rng = index_rng(p.seed ^ 0xB007, i, n);
    v(centered(&mut rng) * 200.0, centered(&mut rng) * 200.0, centered(&mut rng) * 200.0)
}

/// Boot colors are random per particle, drawn the same way as positions.
pub fn scatter_color(i: usize, n: usize, seed: u64) -> Vec3 {
    let mut rng = index_rng(seed ^ 0xC010, i, n);
    Vec3::new(rng.gen(), rng.gen(), rng.gen())
}
