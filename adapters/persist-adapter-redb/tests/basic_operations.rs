//! Integration tests for the redb persistence adapter, exercised as an
//! external crate would use it: through `PersistStore`/`RoomStore` only.

use playhtml_persist_adapter_redb::RedbStore;
use playhtml_room::storage::{PersistStore, RoomStore};
use playhtml_types::RoomId;
use tempfile::TempDir;

async fn create_test_store() -> (RedbStore, TempDir) {
	let temp_dir = TempDir::new().expect("failed to create temp directory");
	let store = RedbStore::open(temp_dir.path().join("rooms.redb")).expect("failed to open store");
	(store, temp_dir)
}

#[tokio::test]
async fn unknown_room_has_no_document() {
	let (store, _temp) = create_test_store().await;
	let room_id = RoomId::from("never-touched");

	assert!(store.load(&room_id).await.expect("load should succeed").is_none());
}

#[tokio::test]
async fn upsert_overwrites_previous_snapshot() {
	let (store, _temp) = create_test_store().await;
	let room_id = RoomId::from("doc1");

	store.upsert(&room_id, b"first-snapshot").await.expect("first upsert");
	store.upsert(&room_id, b"second-snapshot").await.expect("second upsert");

	let loaded = store.load(&room_id).await.expect("load").expect("snapshot present");
	assert_eq!(loaded, b"second-snapshot");
}

#[tokio::test]
async fn rooms_are_independent() {
	let (store, _temp) = create_test_store().await;
	let room_a = RoomId::from("room-a");
	let room_b = RoomId::from("room-b");

	store.upsert(&room_a, b"alpha").await.expect("upsert a");
	store.upsert(&room_b, b"beta").await.expect("upsert b");

	assert_eq!(store.load(&room_a).await.expect("load a"), Some(b"alpha".to_vec()));
	assert_eq!(store.load(&room_b).await.expect("load b"), Some(b"beta".to_vec()));
}

#[tokio::test]
async fn redirect_chain_resolves_and_is_cascade_deleted() {
	let (store, _temp) = create_test_store().await;
	let legacy = RoomId::from("legacy-name");
	let also_legacy = RoomId::from("also-legacy-name");
	let canonical = RoomId::from("canonical-name");

	store.redirect_insert(&legacy, &canonical).await.expect("insert redirect");
	store.redirect_insert(&also_legacy, &canonical).await.expect("insert second redirect");

	assert_eq!(store.redirect_get(&legacy).await.expect("get"), Some(canonical.clone()));
	assert_eq!(store.redirect_get(&also_legacy).await.expect("get"), Some(canonical.clone()));

	store.redirect_delete_where_new(&canonical).await.expect("cascade delete");

	assert!(store.redirect_get(&legacy).await.expect("get after delete").is_none());
	assert!(store.redirect_get(&also_legacy).await.expect("get after delete").is_none());
}

#[tokio::test]
async fn room_state_persists_across_reopen() {
	let temp_dir = TempDir::new().expect("failed to create temp directory");
	let db_path = temp_dir.path().join("rooms.redb");
	let room_id = RoomId::from("persisted-room");

	{
		let store = RedbStore::open(&db_path).expect("open store");
		let mut state = store.load_state(&room_id).await.expect("load default state");
		assert_eq!(state.reset_epoch, 0);
		state.reset_epoch = 7;
		store.save_state(&room_id, &state).await.expect("save state");
	}

	{
		let store = RedbStore::open(&db_path).expect("reopen store");
		let state = store.load_state(&room_id).await.expect("reload state");
		assert_eq!(state.reset_epoch, 7);
	}
}
