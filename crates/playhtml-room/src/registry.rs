//! [`RoomRegistry`] owns the map of live rooms and lazily spawns a
//! [`crate::actor::RoomActor`] task the first time a room ID is touched
//! (SPEC_FULL.md §5.1). [`RoomHandle`] is the clonable mailbox every other
//! component — the sync endpoint, the bridge, the admin routes — uses to
//! talk to that room without ever touching its state directly.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use playhtml_types::{ClResult, Config, Error, RoomId};
use tokio::sync::oneshot;

use crate::bridge::ApplySubtreesBody;
use crate::commands::{ConnMessage, ConnectionId, HardResetResponse, InspectResponse, LiveCompareResponse, RawDataResponse, RoomCommand};
use crate::model::Permission;
use crate::storage::{PersistStore, RoomStore};

/// A clonable mailbox for one room's actor task.
#[derive(Clone)]
pub struct RoomHandle {
	room_id: RoomId,
	tx: tokio::sync::mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
	pub(crate) fn new(room_id: RoomId, tx: tokio::sync::mpsc::UnboundedSender<RoomCommand>) -> Self {
		Self { room_id, tx }
	}

	pub fn room_id(&self) -> &RoomId {
		&self.room_id
	}

	fn send(&self, command: RoomCommand) {
		// The only way this fails is the actor task having already exited
		// (e.g. during shutdown); dropping the command is the right call
		// since there is nobody left to answer a reply channel anyway.
		let _ = self.tx.send(command);
	}

	async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand) -> ClResult<T> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.send(build(reply_tx));
		reply_rx.await.map_err(|_| Error::Internal("room actor dropped the reply channel".to_string()))
	}

	pub async fn state_vector(&self) -> ClResult<Vec<u8>> {
		self.call(|reply| RoomCommand::StateVector { reply }).await
	}

	pub async fn sync_step1(&self, state_vector: Vec<u8>) -> ClResult<ClResult<Vec<u8>>> {
		self.call(|reply| RoomCommand::SyncStep1 { state_vector, reply }).await
	}

	pub async fn client_update(&self, update: Vec<u8>) -> ClResult<ClResult<()>> {
		self.call(|reply| RoomCommand::ClientUpdate { update, reply }).await
	}

	pub async fn current_reset_epoch(&self) -> ClResult<i64> {
		self.call(|reply| RoomCommand::CurrentResetEpoch { reply }).await
	}

	pub async fn add_shared_references(&self, refs: Vec<(RoomId, Vec<String>)>, lease_ms: i64) -> ClResult<Vec<(RoomId, Vec<String>)>> {
		self.call(|reply| RoomCommand::AddSharedReferences { refs, lease_ms, reply }).await
	}

	pub async fn set_shared_elements(&self, elements: Vec<(String, Permission)>) -> ClResult<()> {
		self.call(|reply| RoomCommand::SetSharedElements { elements, reply }).await
	}

	pub async fn register_shared_element(&self, element_id: String, permission: Permission) -> ClResult<()> {
		self.call(|reply| RoomCommand::RegisterSharedElement { element_id, permission, reply }).await
	}

	pub async fn subscribe(&self, consumer_room_id: RoomId, element_ids: Vec<String>, lease_ms: i64) -> ClResult<Vec<String>> {
		self.call(|reply| RoomCommand::Subscribe { consumer_room_id, element_ids, lease_ms, reply }).await
	}

	pub async fn export_permissions(&self, element_ids: Vec<String>) -> ClResult<HashMap<String, Permission>> {
		self.call(|reply| RoomCommand::ExportPermissions { element_ids, reply }).await
	}

	pub async fn apply_subtrees_immediate(&self, body: ApplySubtreesBody) -> ClResult<ClResult<()>> {
		self.call(|reply| RoomCommand::ApplySubtreesImmediate { body, reply }).await
	}

	pub async fn inspect(&self) -> ClResult<ClResult<InspectResponse>> {
		self.call(|reply| RoomCommand::Inspect { reply }).await
	}

	pub async fn raw_data(&self) -> ClResult<ClResult<RawDataResponse>> {
		self.call(|reply| RoomCommand::RawData { reply }).await
	}

	pub async fn live_compare(&self) -> ClResult<ClResult<LiveCompareResponse>> {
		self.call(|reply| RoomCommand::LiveCompare { reply }).await
	}

	pub async fn remove_subscriber(&self, consumer_room_id: RoomId) -> ClResult<bool> {
		self.call(|reply| RoomCommand::RemoveSubscriber { consumer_room_id, reply }).await
	}

	pub async fn force_save_live(&self) -> ClResult<ClResult<()>> {
		self.call(|reply| RoomCommand::ForceSaveLive { reply }).await
	}

	pub async fn force_reload_live(&self) -> ClResult<ClResult<()>> {
		self.call(|reply| RoomCommand::ForceReloadLive { reply }).await
	}

	pub async fn hard_reset(&self) -> ClResult<ClResult<HardResetResponse>> {
		self.call(|reply| RoomCommand::HardReset { reply }).await
	}

	pub async fn restore_raw(&self, snapshot_base64: String, bump_epoch: bool) -> ClResult<ClResult<HardResetResponse>> {
		self.call(|reply| RoomCommand::RestoreRaw { snapshot_base64, bump_epoch, reply }).await
	}

	pub async fn register_connection(&self, sender: tokio::sync::mpsc::UnboundedSender<ConnMessage>) -> ClResult<ConnectionId> {
		self.call(|reply| RoomCommand::RegisterConnection { sender, reply }).await
	}

	pub fn unregister_connection(&self, id: ConnectionId) {
		self.send(RoomCommand::UnregisterConnection { id });
	}

	/// Relays `message` to every connection but `from`, unchanged. Used for
	/// awareness passthrough and non-control text broadcast (SPEC_FULL.md §4.4).
	pub fn broadcast_raw(&self, from: ConnectionId, message: ConnMessage) {
		self.send(RoomCommand::BroadcastRaw { from, message });
	}
}

/// Shared dependencies every room actor needs: the two storage backends, the
/// lease/prune timings from [`Config`], and a weak handle back to the
/// registry itself so an actor can dispatch bridge RPCs to peer rooms (the
/// "mailbox" abstraction of SPEC_FULL.md §5.1/§9, collapsed to an in-process
/// call since this crate carries no horizontal sharding).
pub struct RoomDeps {
	pub persist: Arc<dyn PersistStore>,
	pub room_store: Arc<dyn RoomStore>,
	pub prune_interval_secs: u64,
	pub registry: Weak<RoomRegistry>,
}

/// Owns every currently-live room, spawning actors lazily on first touch.
///
/// Backed by [`DashMap`] rather than a single `Mutex<HashMap<_>>` so that
/// looking up one room's handle never contends with another room's lookup —
/// the same sharded-cache approach the pack's own `crdt-adapter-redb` uses
/// for its live document-instance cache (`DashMap<String, Arc<DocumentInstance>>`),
/// generalized here from "cache of instances behind a storage adapter" to
/// "registry of live per-room actor handles".
pub struct RoomRegistry {
	deps: Arc<RoomDeps>,
	rooms: DashMap<RoomId, RoomHandle>,
}

impl RoomRegistry {
	pub fn new(persist: Arc<dyn PersistStore>, room_store: Arc<dyn RoomStore>, config: &Config) -> Arc<Self> {
		Arc::new_cyclic(|weak| Self {
			deps: Arc::new(RoomDeps {
				persist,
				room_store,
				prune_interval_secs: config.prune_interval_secs,
				registry: weak.clone(),
			}),
			rooms: DashMap::new(),
		})
	}

	/// Returns the live handle for `room_id`, spawning a fresh actor task if
	/// this is the first time the room has been touched since process start.
	pub async fn get_or_create(self: &Arc<Self>, room_id: &RoomId) -> RoomHandle {
		if let Some(existing) = self.rooms.get(room_id) {
			return existing.clone();
		}
		// `entry` holds this room's shard lock for the whole match arm, so the
		// miss-then-spawn-then-insert sequence below is atomic per room: two
		// concurrent first touches can never both spawn an actor for the same
		// ID (that would violate the single-writer-actor invariant, SPEC_FULL.md
		// §5). `RoomActor::spawn` itself only launches the task and returns a
		// handle synchronously, so nothing awaits while the shard is locked.
		match self.rooms.entry(room_id.clone()) {
			dashmap::mapref::entry::Entry::Occupied(existing) => existing.get().clone(),
			dashmap::mapref::entry::Entry::Vacant(vacant) => {
				let handle = crate::actor::RoomActor::spawn(room_id.clone(), Arc::clone(&self.deps));
				vacant.insert(handle.clone());
				handle
			}
		}
	}

	/// Returns the handle only if the room is already live, without spawning
	/// one — used by admin endpoints that should 404 on untouched rooms
	/// rather than conjuring empty state for them.
	pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
		self.rooms.get(room_id).map(|entry| entry.clone())
	}

	/// Number of rooms with a live actor task, for `/healthz` (SPEC_FULL.md §6.1).
	pub async fn room_count(&self) -> usize {
		self.rooms.len()
	}
}
