//! # particle_field
//!
//! A large point cloud whose shape, color and motion follow the session
//! state and live hand/voice input.
//!
//! ## Visual states
//!
//! | Session status | Visual state | Target | Lerp / frame |
//! |---|---|---|---|
//! | `INITIALIZING` (or anything unknown) | `Boot` | random scatter | 0.02 |
//! | `AUTH_PENDING` | `AuthFace` | face mask | 0.15 |
//! | `ONLINE` | `Idle` | current cycle shape, breathing | 0.08 |
//! | `LISTENING` | `Action` | stream toward the hand | 0.2 |
//!
//! Targets are recomputed only when the state or shape changes; everything
//! that moves every frame (breathing, jitter, the stream ripple, spin) is
//! applied on top of them inside [`ParticleFieldEngine::step`].

pub mod audio;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod shapes;
pub mod visual;

pub use audio::{open_default_source, AmplitudeAnalyzer, AmplitudeSource, Silence};
pub use config::{FieldConfig, LerpSpeeds};
pub use engine::{FieldFrame, FieldRenderer, HandModulation, ParticleFieldEngine, ParticleRecord};
pub use error::AudioError;
pub use math::Vec3;
pub use shapes::{Shape, ShapeDescriptor, ShapeParams, CYCLE};
pub use visual::VisualState;
