//! End-to-end bridge scenarios exercised against real [`RoomActor`] tasks
//! wired through a single [`RoomRegistry`], with in-memory stand-ins for the
//! persistence adapters. Mirrors the "Concrete end-to-end scenarios" and
//! "Testable Properties" sections of SPEC_FULL.md: echo suppression, per-
//! subscriber fanout filtering, read-only drops, epoch-gated autosave and
//! bridge application, and lease pruning.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use playhtml_room::{Permission, RoomRegistry, RoomState};
use playhtml_room::storage::{PersistStore, RoomStore};
use playhtml_types::{ClResult, Config, RoomId};
use yrs::updates::encoder::Encode;
use yrs::{Doc, MapPrelim, MapRef, ReadTxn, StateVector, Transact};

#[derive(Debug, Default)]
struct MemoryPersistStore {
	documents: Mutex<HashMap<RoomId, Vec<u8>>>,
	redirects: Mutex<HashMap<RoomId, RoomId>>,
}

#[async_trait]
impl PersistStore for MemoryPersistStore {
	async fn load(&self, room_id: &RoomId) -> ClResult<Option<Vec<u8>>> {
		Ok(self.documents.lock().unwrap().get(room_id).cloned())
	}

	async fn upsert(&self, room_id: &RoomId, blob: &[u8]) -> ClResult<()> {
		self.documents.lock().unwrap().insert(room_id.clone(), blob.to_vec());
		Ok(())
	}

	async fn redirect_insert(&self, old_name: &RoomId, new_name: &RoomId) -> ClResult<()> {
		self.redirects.lock().unwrap().insert(old_name.clone(), new_name.clone());
		Ok(())
	}

	async fn redirect_get(&self, old_name: &RoomId) -> ClResult<Option<RoomId>> {
		Ok(self.redirects.lock().unwrap().get(old_name).cloned())
	}

	async fn redirect_delete_where_new(&self, new_name: &RoomId) -> ClResult<()> {
		self.redirects.lock().unwrap().retain(|_, v| v != new_name);
		Ok(())
	}
}

#[derive(Debug, Default)]
struct MemoryRoomStore {
	states: Mutex<HashMap<RoomId, RoomState>>,
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
	async fn load_state(&self, room_id: &RoomId) -> ClResult<RoomState> {
		Ok(self.states.lock().unwrap().get(room_id).cloned().unwrap_or_default())
	}

	async fn save_state(&self, room_id: &RoomId, state: &RoomState) -> ClResult<()> {
		self.states.lock().unwrap().insert(room_id.clone(), state.clone());
		Ok(())
	}
}

fn test_config(prune_interval_secs: u64) -> Config {
	Config {
		persist_url: "memory".into(),
		persist_key: None,
		admin_token: None,
		listen_addr: "127.0.0.1:0".into(),
		prune_interval_secs,
		subscriber_lease_secs: 12 * 60 * 60,
	}
}

fn test_registry(prune_interval_secs: u64) -> std::sync::Arc<RoomRegistry> {
	RoomRegistry::new(
		std::sync::Arc::new(MemoryPersistStore::default()),
		std::sync::Arc::new(MemoryRoomStore::default()),
		&test_config(prune_interval_secs),
	)
}

/// Builds a standalone full-state yrs update setting `play.<tag>.<element_id>.<field> = value`,
/// simulating a real client's local edit arriving over the sync protocol.
fn client_write_update(tag: &str, element_id: &str, field: &str, value: bool) -> Vec<u8> {
	let doc = Doc::new();
	let play = doc.get_or_insert_map("play");
	{
		let mut txn = doc.transact_mut();
		let tag_map: MapRef = play.insert(&mut txn, tag, MapPrelim::default());
		let elem: MapRef = tag_map.insert(&mut txn, element_id, MapPrelim::default());
		elem.insert(&mut txn, field, value);
	}
	let txn = doc.transact();
	txn.encode_state_as_update_v1(&StateVector::default())
}

async fn settle() {
	tokio::time::sleep(Duration::from_millis(50)).await;
}

/// S1: basic mirror. Consumer writes `toggle.e1.on = true`; the source
/// observes the same value after one RPC round trip, and nothing loops back.
#[tokio::test]
async fn s1_basic_mirror_propagates_consumer_write_to_source() {
	let registry = test_registry(3600);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;
	let consumer = registry.get_or_create(&RoomId::new("consumer-b")).await;

	// A already has e1 = false and shares it read-write.
	source.client_update(client_write_update("toggle", "e1", "on", false)).await.unwrap().unwrap();
	source.set_shared_elements(vec![("e1".to_string(), Permission::ReadWrite)]).await.unwrap();
	source.subscribe(consumer.room_id().clone(), vec!["e1".to_string()], 12 * 3600 * 1000).await.unwrap();

	// B declares it wants e1 from A.
	consumer
		.add_shared_references(vec![(source.room_id().clone(), vec!["e1".to_string()])], 12 * 3600 * 1000)
		.await
		.unwrap();

	// B writes locally.
	consumer.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();

	settle().await;

	source.force_save_live().await.unwrap().unwrap();
	let inspected = source.inspect().await.unwrap().unwrap();
	let play = inspected.play.expect("source should have persisted play data");
	assert_eq!(play["toggle"]["e1"]["on"], serde_json::json!(true));
}

/// S2: read-only elements never accept consumer writes. After propagation,
/// the source's value for the read-only element is unchanged.
#[tokio::test]
async fn s2_read_only_element_drops_consumer_write() {
	let registry = test_registry(3600);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;
	let consumer = registry.get_or_create(&RoomId::new("consumer-b")).await;

	source.client_update(client_write_update("toggle", "e1", "on", false)).await.unwrap().unwrap();
	source.set_shared_elements(vec![("e1".to_string(), Permission::ReadOnly)]).await.unwrap();
	source.subscribe(consumer.room_id().clone(), vec!["e1".to_string()], 12 * 3600 * 1000).await.unwrap();
	consumer
		.add_shared_references(vec![(source.room_id().clone(), vec!["e1".to_string()])], 12 * 3600 * 1000)
		.await
		.unwrap();

	consumer.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();
	settle().await;

	source.force_save_live().await.unwrap().unwrap();
	let inspected = source.inspect().await.unwrap().unwrap();
	let play = inspected.play.expect("source should have persisted play data");
	assert_eq!(play["toggle"]["e1"]["on"], serde_json::json!(false));
}

/// S3: fanout. Two consumers subscribe to different subsets of a source's
/// elements; a write to one element only reaches the subscriber that asked
/// for it.
#[tokio::test]
async fn s3_fanout_is_filtered_per_subscriber() {
	let registry = test_registry(3600);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;
	let consumer_b = registry.get_or_create(&RoomId::new("consumer-b")).await;
	let consumer_c = registry.get_or_create(&RoomId::new("consumer-c")).await;

	source
		.set_shared_elements(vec![
			("e1".to_string(), Permission::ReadWrite),
			("e2".to_string(), Permission::ReadWrite),
		])
		.await
		.unwrap();
	// B subscribes only to e1; C subscribes only to e2.
	source.subscribe(consumer_b.room_id().clone(), vec!["e1".to_string()], 12 * 3600 * 1000).await.unwrap();
	source.subscribe(consumer_c.room_id().clone(), vec!["e2".to_string()], 12 * 3600 * 1000).await.unwrap();
	// Each consumer also records the matching outgoing reference, which the
	// recipient-side filter in apply_subtrees_immediate checks against.
	consumer_b
		.add_shared_references(vec![(source.room_id().clone(), vec!["e1".to_string()])], 12 * 3600 * 1000)
		.await
		.unwrap();
	consumer_c
		.add_shared_references(vec![(source.room_id().clone(), vec!["e2".to_string()])], 12 * 3600 * 1000)
		.await
		.unwrap();

	// A local edit on the source itself (e.g. another client in the room).
	source.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();
	settle().await;

	consumer_b.force_save_live().await.unwrap().unwrap();
	consumer_c.force_save_live().await.unwrap().unwrap();
	let b_play = consumer_b.inspect().await.unwrap().unwrap().play.unwrap_or(serde_json::json!({}));
	let c_play = consumer_c.inspect().await.unwrap().unwrap().play.unwrap_or(serde_json::json!({}));

	assert_eq!(b_play["toggle"]["e1"]["on"], serde_json::json!(true));
	assert!(
		c_play.get("toggle").and_then(|t| t.get("e1")).is_none(),
		"consumer C did not subscribe to e1 and must not receive it"
	);
}

/// S6 (epoch gating half): a bridge message tagged with a stale `resetEpoch`
/// is dropped before any mutation, per SPEC_FULL.md §4.5.3's epoch guard.
#[tokio::test]
async fn stale_epoch_apply_subtrees_is_dropped() {
	let registry = test_registry(3600);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;
	let consumer = registry.get_or_create(&RoomId::new("consumer-b")).await;

	source.client_update(client_write_update("toggle", "e1", "on", false)).await.unwrap().unwrap();
	source.set_shared_elements(vec![("e1".to_string(), Permission::ReadWrite)]).await.unwrap();
	source.subscribe(consumer.room_id().clone(), vec!["e1".to_string()], 12 * 3600 * 1000).await.unwrap();

	// Bump the source's epoch via a hard reset, then send a stale-epoch body directly.
	let reset = source.hard_reset().await.unwrap().unwrap();
	assert!(reset.reset_epoch > 0);

	let mut subtrees = serde_json::Map::new();
	subtrees.insert(
		"toggle".to_string(),
		serde_json::json!({"e1": {"on": true}}),
	);
	let body = playhtml_room::ApplySubtreesBody {
		subtrees,
		sender: consumer.room_id().clone(),
		origin_kind: playhtml_room::OriginKindWire::Consumer,
		reset_epoch: reset.reset_epoch - 1,
	};
	source.apply_subtrees_immediate(body).await.unwrap().unwrap();

	source.force_save_live().await.unwrap().unwrap();
	let play = source.inspect().await.unwrap().unwrap().play.expect("play present");
	assert_eq!(play["toggle"]["e1"]["on"], serde_json::json!(false), "stale-epoch write must be dropped");
}

/// S7: lease pruning. A subscriber past its lease is removed by the next
/// alarm; one within its lease survives.
#[tokio::test]
async fn s7_lease_prune_removes_only_stale_subscribers() {
	// A 1-second prune interval keeps the test fast while staying well clear
	// of the "fires again immediately" edge case a zero interval would hit.
	let registry = test_registry(1);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;

	// A negative lease means this subscriber is already past its lease the
	// instant it's created (`subscribe` always stamps `lastSeen = now`, so
	// there's no public way to backdate it directly).
	source
		.subscribe(RoomId::new("stale-consumer"), vec!["e1".to_string()], -60_000)
		.await
		.unwrap();
	source
		.subscribe(RoomId::new("fresh-consumer"), vec!["e1".to_string()], 12 * 3600 * 1000)
		.await
		.unwrap();

	// Wait out one full prune interval so the alarm armed by the first
	// subscribe actually fires.
	tokio::time::sleep(Duration::from_millis(1_100)).await;

	let inspected = source.inspect().await.unwrap().unwrap();
	let remaining: Vec<String> = inspected.subscribers.iter().map(|s| s.consumer_room_id.to_string()).collect();
	assert!(!remaining.contains(&"stale-consumer".to_string()), "expired subscriber should be pruned: {remaining:?}");
	assert!(remaining.contains(&"fresh-consumer".to_string()), "fresh subscriber should survive: {remaining:?}");
}

/// Epoch monotonicity (invariant 5): a second reset always produces a
/// strictly larger epoch than the first.
#[tokio::test]
async fn epoch_monotonicity_across_successive_resets() {
	let registry = test_registry(3600);
	let room = registry.get_or_create(&RoomId::new("reset-room")).await;

	room.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();
	let first = room.hard_reset().await.unwrap().unwrap();
	// Ensure a strictly later wall-clock tick even on fast hardware.
	tokio::time::sleep(Duration::from_millis(2)).await;
	let second = room.hard_reset().await.unwrap().unwrap();

	assert!(second.reset_epoch > first.reset_epoch);
}

/// S4 (late registration): a consumer subscribes to an element before the
/// source has registered permissions for it. Once the source registers it
/// (with the element already present in its doc), the consumer receives it
/// within one RPC, without needing to write anything new.
#[tokio::test]
async fn s4_late_registration_pushes_to_waiting_subscriber() {
	let registry = test_registry(3600);
	let source = registry.get_or_create(&RoomId::new("source-a")).await;
	let consumer = registry.get_or_create(&RoomId::new("consumer-b")).await;

	// B subscribes to e1 before A has shared anything.
	source.subscribe(consumer.room_id().clone(), vec!["e1".to_string()], 12 * 3600 * 1000).await.unwrap();
	consumer
		.add_shared_references(vec![(source.room_id().clone(), vec!["e1".to_string()])], 12 * 3600 * 1000)
		.await
		.unwrap();

	// A's doc already holds e1 from some other local client, but it hasn't
	// been registered as shared yet.
	source.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();

	// Now an A-side client registers e1 as shared.
	source.register_shared_element("e1".to_string(), Permission::ReadWrite).await.unwrap();
	settle().await;

	consumer.force_save_live().await.unwrap().unwrap();
	let play = consumer.inspect().await.unwrap().unwrap().play.expect("consumer should have persisted play data");
	assert_eq!(play["toggle"]["e1"]["on"], serde_json::json!(true), "late registration should push the current value");
}

/// S5 (hard reset): every connection registered on the room receives a
/// `room-reset` text frame followed by a close frame carrying code 4000,
/// and the reported epoch strictly increases.
#[tokio::test]
async fn s5_hard_reset_closes_connections_with_4000() {
	use playhtml_room::ConnMessage;

	let registry = test_registry(3600);
	let room = registry.get_or_create(&RoomId::new("reset-room")).await;

	room.client_update(client_write_update("toggle", "e1", "on", true)).await.unwrap().unwrap();

	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	room.register_connection(tx).await.unwrap();

	let reset = room.hard_reset().await.unwrap().unwrap();
	assert!(reset.reset_epoch > 0);

	let text_msg = rx.recv().await.expect("expected a room-reset text frame");
	match text_msg {
		ConnMessage::Text(body) => {
			let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
			assert_eq!(parsed["type"], serde_json::json!("room-reset"));
			assert_eq!(parsed["resetEpoch"], serde_json::json!(reset.reset_epoch));
		}
		other => panic!("expected a text frame first, got {other:?}"),
	}

	let close_msg = rx.recv().await.expect("expected a close frame");
	match close_msg {
		ConnMessage::Close { code, reason } => {
			assert_eq!(code, 4000);
			assert_eq!(reason, "Room Reset by Admin");
		}
		other => panic!("expected a close frame, got {other:?}"),
	}
}
