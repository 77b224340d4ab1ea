//! Shared types, the project-wide error taxonomy and configuration for the
//! playhtml room coordination server.

pub mod config;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod timestamp;

pub use config::Config;
pub use error::{ClResult, Error, ErrorResponse};
pub use ids::RoomId;
pub use timestamp::Timestamp;

/// Arbitrary plain-JSON-compatible data exchanged between the bridge, the
/// admin endpoints and the CRDT subtree extraction primitives.
pub type Value = serde_json::Value;
