//! Adapter traits for the Persistence Store (SPEC_FULL.md §4.2) and Room
//! Storage (§4.2's sibling). Mirrors the shape of a `CrdtAdapter`-style
//! trait: narrow, async, and implemented once per backing store.

use async_trait::async_trait;
use playhtml_types::{ClResult, RoomId};

use crate::model::RoomState;

/// Durable key-value storage for CRDT snapshots plus the room-ID redirect
/// table.
#[async_trait]
pub trait PersistStore: std::fmt::Debug + Send + Sync {
	/// Loads the most recently stored snapshot for `room_id`, or `None` if
	/// the room has never been saved.
	async fn load(&self, room_id: &RoomId) -> ClResult<Option<Vec<u8>>>;

	/// Last-writer-wins upsert of a room's snapshot.
	async fn upsert(&self, room_id: &RoomId, blob: &[u8]) -> ClResult<()>;

	async fn redirect_insert(&self, old_name: &RoomId, new_name: &RoomId) -> ClResult<()>;

	async fn redirect_get(&self, old_name: &RoomId) -> ClResult<Option<RoomId>>;

	/// Cascades from a `documents` row delete: removes every redirect
	/// pointing at `new_name`.
	async fn redirect_delete_where_new(&self, new_name: &RoomId) -> ClResult<()>;
}

/// Durable per-room storage for subscribers, outgoing references,
/// permissions, the reset epoch and the armed alarm time.
#[async_trait]
pub trait RoomStore: std::fmt::Debug + Send + Sync {
	async fn load_state(&self, room_id: &RoomId) -> ClResult<RoomState>;
	async fn save_state(&self, room_id: &RoomId, state: &RoomState) -> ClResult<()>;
}
