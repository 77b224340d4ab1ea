//! Wire framing constants for the sync WebSocket (SPEC_FULL.md §4.4.1).
//!
//! Shared between [`crate::actor`] (which frames outgoing update broadcasts)
//! and the server's connection handler (which frames outgoing handshake
//! messages and parses incoming ones) so both sides agree on one envelope.

/// Outer frame tag: the payload is a sync-protocol message.
pub const MSG_OUTER_SYNC: u8 = 0;
/// Outer frame tag: the payload is an opaque awareness blob, forwarded
/// verbatim to every other connection in the room and never interpreted.
pub const MSG_OUTER_AWARENESS: u8 = 1;

/// Inner sync message: sender's state vector, requesting the peer's diff.
pub const MSG_SYNC_STEP1: u8 = 0;
/// Inner sync message: a diff computed against a peer's state vector.
pub const MSG_SYNC_STEP2: u8 = 1;
/// Inner sync message: an update delta applied outside the step1/step2
/// handshake (an ordinary local edit, or a mirrored bridge write).
pub const MSG_SYNC_UPDATE: u8 = 2;
