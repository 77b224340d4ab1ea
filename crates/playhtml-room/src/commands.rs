//! The room actor's mailbox (SPEC_FULL.md §5.1): every external entry point
//! — the sync endpoint, the bridge RPC dispatcher, the admin control plane —
//! talks to a room exclusively through one of these commands plus a oneshot
//! reply, which is what makes the single-writer-actor guarantee mechanical.

use std::collections::HashMap;

use playhtml_crdt::OriginKind;
use playhtml_types::{ClResult, RoomId};
use tokio::sync::oneshot;

use crate::bridge::ApplySubtreesBody;
use crate::model::{Permission, SharedRefEntry, Subscriber};

pub type ConnectionId = u64;

/// A message pushed out to one client's websocket task.
#[derive(Debug, Clone)]
pub enum ConnMessage {
	Binary(Vec<u8>),
	Text(String),
	Close { code: u16, reason: String },
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResponse {
	pub subscribers: Vec<Subscriber>,
	pub shared_refs: Vec<SharedRefEntry>,
	pub shared_permissions: HashMap<String, Permission>,
	pub reset_epoch: i64,
	pub connection_count: usize,
	/// The `play` map reloaded straight from the persistence store, never
	/// from the live in-memory document (SPEC_FULL.md §4.7).
	pub play: Option<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataResponse {
	pub document_base64: String,
	pub reset_epoch: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCompareResponse {
	pub equal: bool,
	pub direct_only_tags: Vec<String>,
	pub live_only_tags: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardResetResponse {
	pub reset_epoch: i64,
}

pub enum RoomCommand {
	// --- Sync endpoint (SPEC_FULL.md §4.4) ---
	/// The doc's own state vector, sent to a freshly connected client as the
	/// server's half of the sync-step1/sync-step2 handshake.
	StateVector { reply: oneshot::Sender<Vec<u8>> },
	SyncStep1 { state_vector: Vec<u8>, reply: oneshot::Sender<ClResult<Vec<u8>>> },
	ClientUpdate { update: Vec<u8>, reply: oneshot::Sender<ClResult<()>> },
	CurrentResetEpoch { reply: oneshot::Sender<i64> },
	/// Merges `(sourceRoomId, elementIds)` pairs into this room's
	/// `sharedReferences`; returns the subset that was newly added and
	/// therefore still needs an outbound `subscribe` RPC.
	AddSharedReferences {
		refs: Vec<(RoomId, Vec<String>)>,
		lease_ms: i64,
		reply: oneshot::Sender<Vec<(RoomId, Vec<String>)>>,
	},
	SetSharedElements { elements: Vec<(String, Permission)>, reply: oneshot::Sender<()> },
	RegisterSharedElement { element_id: String, permission: Permission, reply: oneshot::Sender<()> },

	// --- Bridge RPC surface (SPEC_FULL.md §4.5.2) ---
	Subscribe { consumer_room_id: RoomId, element_ids: Vec<String>, lease_ms: i64, reply: oneshot::Sender<Vec<String>> },
	ExportPermissions { element_ids: Vec<String>, reply: oneshot::Sender<HashMap<String, Permission>> },
	ApplySubtreesImmediate { body: ApplySubtreesBody, reply: oneshot::Sender<ClResult<()>> },

	// --- Admin control plane (SPEC_FULL.md §4.7) ---
	Inspect { reply: oneshot::Sender<ClResult<InspectResponse>> },
	RawData { reply: oneshot::Sender<ClResult<RawDataResponse>> },
	LiveCompare { reply: oneshot::Sender<ClResult<LiveCompareResponse>> },
	RemoveSubscriber { consumer_room_id: RoomId, reply: oneshot::Sender<bool> },
	ForceSaveLive { reply: oneshot::Sender<ClResult<()>> },
	ForceReloadLive { reply: oneshot::Sender<ClResult<()>> },
	HardReset { reply: oneshot::Sender<ClResult<HardResetResponse>> },
	RestoreRaw { snapshot_base64: String, bump_epoch: bool, reply: oneshot::Sender<ClResult<HardResetResponse>> },

	// --- Connection registry ---
	RegisterConnection { sender: tokio::sync::mpsc::UnboundedSender<ConnMessage>, reply: oneshot::Sender<ConnectionId> },
	UnregisterConnection { id: ConnectionId },
	/// Verbatim passthrough: awareness frames and non-control text messages
	/// bypass the CRDT entirely and are relayed to every other connection in
	/// the room unchanged (SPEC_FULL.md §4.4/§4.4.1).
	BroadcastRaw { from: ConnectionId, message: ConnMessage },

	// --- Internal, no external caller ---
	DocUpdated { kind: OriginKind, delta: Vec<u8> },
	ReleaseSkipSave,
}
