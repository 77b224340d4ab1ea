//! Room coordination: the per-room single-writer actor, the cross-room
//! subscription bridge, lease pruning and the storage adapter traits it all
//! runs against (SPEC_FULL.md §4-5).

pub mod actor;
pub mod bridge;
pub mod commands;
pub mod model;
pub mod normalizer;
pub mod protocol;
pub mod registry;
pub mod storage;

pub use bridge::{ApplySubtreesBody, OriginKindWire, SubscribeResponse};
pub use commands::{
	ConnMessage, ConnectionId, HardResetResponse, InspectResponse, LiveCompareResponse, RawDataResponse, RoomCommand,
};
pub use model::{Permission, RoomState, SharedRefEntry, Subscriber};
pub use protocol::{MSG_OUTER_AWARENESS, MSG_OUTER_SYNC, MSG_SYNC_STEP1, MSG_SYNC_STEP2, MSG_SYNC_UPDATE};
pub use registry::{RoomDeps, RoomHandle, RoomRegistry};
pub use storage::{PersistStore, RoomStore};
