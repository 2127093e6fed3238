//! # bridge_doc
//!
//! A shared, polled status document that carries the sign-in state and live
//! hand/voice telemetry from the sensor process to the renderer.
//!
//! The contract is eventual consistency with bounded staleness:
//!
//! * the producer merges partial updates and rewrites the whole document;
//! * the consumer polls on a fixed interval and never blocks or fails; a
//!   missing, unreadable, or malformed document just means "nothing new";
//! * every write bumps `version`, so a consumer can skip re-applying a
//!   document it has already seen.

pub mod error;
pub mod poller;
pub mod publisher;
pub mod snapshot;
pub mod store;

pub use error::BridgeError;
pub use poller::{BridgePoller, PollOutcome};
pub use publisher::{BridgePatch, BridgePublisher};
pub use snapshot::{BridgeDocument, BridgeSnapshot, HandPos, SessionStatus};
pub use store::{BridgeStore, FileBridge, MemoryBridge};
