//! Application state: the room registry plus the handful of settings every
//! route needs, wired together the way the reference platform's
//! `AppState`/`App` pair is built in its own `core::app` module.

use std::sync::Arc;

use playhtml_persist_adapter_redb::RedbStore;
use playhtml_room::{PersistStore, RoomRegistry, RoomStore};
use playhtml_types::{ClResult, Config, Error, RoomId};

pub struct AppState {
	pub config: Config,
	pub registry: Arc<RoomRegistry>,
	pub persist: Arc<dyn PersistStore>,
}

/// Shorthand every route module uses as its axum `State` type, mirroring the
/// reference platform's `pub type App = Arc<AppState>;`.
pub type App = Arc<AppState>;

impl AppState {
	pub fn new(config: Config) -> ClResult<App> {
		let store = Arc::new(RedbStore::open(config.persist_url.as_ref())?);
		let persist: Arc<dyn PersistStore> = store.clone();
		let room_store: Arc<dyn RoomStore> = store;

		let registry = RoomRegistry::new(persist.clone(), room_store, &config);

		Ok(Arc::new(Self { config, registry, persist }))
	}

	/// Resolves `(host, path)` into the canonical room ID, following the
	/// redirect table (SPEC_FULL.md §4.1's "on any room lookup ... transparently
	/// operate on the `newName`"). Bounded to guard against a redirect cycle
	/// someone wired into storage by hand.
	pub async fn resolve_room_id(&self, host: &str, path: &str) -> ClResult<RoomId> {
		let mut room_id = playhtml_room::normalizer::normalize(host, path);
		self.follow_redirects(&mut room_id).await?;
		Ok(room_id)
	}

	/// Validates and resolves the room ID carried directly on a request's
	/// `{roomId}` path segment (SPEC_FULL.md §6): unlike [`Self::resolve_room_id`],
	/// which derives a *referenced* room's ID from a `(host, path)` pair
	/// (used for `sharedReferences` entries), this takes the connecting
	/// room's own already-canonical ID and only needs redirect resolution.
	pub async fn resolve_existing_room_id(&self, raw: &str) -> ClResult<RoomId> {
		if playhtml_room::normalizer::is_invalid_plain_id(raw) {
			return Err(Error::ValidationError(format!("invalid room id: {raw}")));
		}
		let mut room_id = RoomId::from(raw);
		self.follow_redirects(&mut room_id).await?;
		Ok(room_id)
	}

	/// Bounded redirect-chain walk, guarding against a cycle wired into
	/// storage by hand (SPEC_FULL.md §4.1).
	async fn follow_redirects(&self, room_id: &mut RoomId) -> ClResult<()> {
		for _ in 0..16 {
			match self.persist.redirect_get(room_id).await? {
				Some(canonical) if canonical != *room_id => *room_id = canonical,
				_ => break,
			}
		}
		Ok(())
	}
}
