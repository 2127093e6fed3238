//! # sensor_auth
//!
//! The sign-in half of the HUD: detector output goes in, an authoritative
//! session state comes out.
//!
//! ## Pipeline
//!
//! | Stage | Type | Role |
//! |---|---|---|
//! | Adapter | [`SensorAdapter`] | face boxes, hand skeletons, transcripts, keys → [`Signal`] |
//! | Classifier | [`GestureClassifier`] | 21 landmarks → pinch, position, fist / victory / palm |
//! | State machine | [`AuthStateMachine`] | signals + deadlines → [`AuthSession`] |
//! | Bus | [`EventBus`] | synchronous delivery of [`CoreEvent`]s |
//!
//! ## Sign-in methods
//!
//! | Method | Accepted while |
//! |---|---|
//! | Face / biometric proximity | `FaceWait` (and later, under [`FacePolicy::Always`]) |
//! | Fist | the override prompt is visible |
//! | Wake phrase | the voice recogniser is enabled |
//! | Typed secret | any waiting state, including `Initializing` |

pub mod auth;
pub mod error;
pub mod events;
pub mod gesture;
pub mod keys;
pub mod sensor;

pub use auth::{AuthConfig, AuthMethod, AuthSession, AuthState, AuthStateMachine, FacePolicy};
pub use error::SensorError;
pub use events::{CoreEvent, EventBus, EventKind, SubscriptionId};
pub use gesture::{
    GestureClass, GestureClassifier, GestureSample, GestureUpdate, HandAnchor, HandLandmarks,
    Landmark, LANDMARK_COUNT,
};
pub use keys::OverrideBuffer;
pub use sensor::{AdaptedFrame, DetectorFrame, FaceBox, GestureLabel, KeyEvent, SensorAdapter, Signal};
