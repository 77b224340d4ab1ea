//! [`RoomActor`]: the single-writer task behind every [`crate::registry::RoomHandle`]
//! (SPEC_FULL.md §5.1). One actor owns exactly one room's live [`PlayDoc`],
//! its durable [`RoomState`], its connection list and its alarm — every
//! mutation is processed off the actor's own `mpsc` mailbox, so nothing
//! outside this file ever touches the document directly.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use playhtml_crdt::{OriginKind, PlayDoc, ORIGIN_C2S, ORIGIN_S2C};
use playhtml_types::{ClResult, Error, RoomId, Timestamp};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::Instant;

use crate::bridge::{self, ApplySubtreesBody, OriginKindWire};
use crate::commands::{
	ConnMessage, ConnectionId, HardResetResponse, InspectResponse, LiveCompareResponse, RawDataResponse, RoomCommand,
};
use crate::model::{Permission, RoomState};
use crate::registry::{RoomDeps, RoomHandle};
use std::sync::Arc;

/// How often the autosave tick fires while the room is dirty (SPEC_FULL.md
/// §4.3: "every few seconds").
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// How long `hard-reset`/`restore-raw` hold the `skipSave` latch open after
/// swapping in the new document, to let any autosave tick already in flight
/// settle before new writes are allowed again.
const SKIP_SAVE_SETTLE: Duration = Duration::from_millis(200);

use crate::protocol::{MSG_OUTER_SYNC, MSG_SYNC_UPDATE};

pub struct RoomActor {
	room_id: RoomId,
	deps: Arc<RoomDeps>,
	self_tx: UnboundedSender<RoomCommand>,
	doc: PlayDoc,
	/// Keeps the update subscription alive for the lifetime of `doc`; never
	/// read directly.
	_update_sub: Option<yrs::Subscription>,
	state: RoomState,
	connections: HashMap<ConnectionId, UnboundedSender<ConnMessage>>,
	next_conn_id: ConnectionId,
	dirty: bool,
	skip_save: bool,
	/// `None` once the room loaded cleanly; set only if the initial
	/// `PersistStore::load` failed, per SPEC_FULL.md §7 ("Fatal" errors
	/// leave the room in an unloaded state rather than crashing it).
	load_error: Option<String>,
}

impl RoomActor {
	/// Spawns the actor task and returns a [`RoomHandle`] for it immediately;
	/// the initial `load` happens asynchronously inside the task, so any
	/// command sent before it completes simply queues on the mailbox.
	pub fn spawn(room_id: RoomId, deps: Arc<RoomDeps>) -> RoomHandle {
		let (tx, rx) = mpsc::unbounded_channel();
		let handle = RoomHandle::new(room_id.clone(), tx.clone());
		tokio::spawn(async move {
			let mut actor = RoomActor::load(room_id, deps, tx).await;
			actor.run(rx).await;
		});
		handle
	}

	async fn load(room_id: RoomId, deps: Arc<RoomDeps>, self_tx: UnboundedSender<RoomCommand>) -> Self {
		let state = match deps.room_store.load_state(&room_id).await {
			Ok(state) => state,
			Err(err) => {
				tracing::warn!(%room_id, %err, "failed to load room storage, starting from defaults");
				RoomState::default()
			}
		};

		let (doc, load_error) = match deps.persist.load(&room_id).await {
			Ok(Some(blob)) => match PlayDoc::from_snapshot(&blob) {
				Ok(doc) => (doc, None),
				Err(err) => {
					tracing::error!(%room_id, %err, "stored snapshot is corrupt");
					(PlayDoc::new(), Some(err.to_string()))
				}
			},
			Ok(None) => (PlayDoc::new(), None),
			Err(err) => {
				tracing::error!(%room_id, %err, "failed to load room snapshot");
				(PlayDoc::new(), Some(err.to_string()))
			}
		};

		// Bootstrap the doc's generation marker to match storage so a brand
		// new room's first autosave isn't rejected as "stale" (see §4.3 and
		// the discussion in DESIGN.md).
		if doc.reset_epoch().is_none() {
			doc.set_reset_epoch(state.reset_epoch, None);
		}

		let sub_tx = self_tx.clone();
		let _update_sub = Some(doc.observe_update(move |delta, kind| {
			let _ = sub_tx.send(RoomCommand::DocUpdated { kind, delta: delta.to_vec() });
		}));

		Self {
			room_id,
			deps,
			self_tx,
			doc,
			_update_sub,
			state,
			connections: HashMap::new(),
			next_conn_id: 0,
			dirty: false,
			skip_save: false,
			load_error,
		}
	}

	async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<RoomCommand>) {
		let mut autosave = tokio::time::interval(AUTOSAVE_INTERVAL);
		autosave.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			// Recomputed every iteration (rather than cached across them) so an
			// alarm newly armed by a command just handled below — e.g. a room's
			// very first `subscribe` — is picked up on the very next `select!`
			// instead of waiting for some other branch to refresh it.
			let alarm_deadline: Option<Instant> = self.state.alarm_at.map(Self::instant_from_timestamp);
			let alarm_sleep = async {
				match alarm_deadline {
					Some(deadline) => tokio::time::sleep_until(deadline).await,
					None => std::future::pending::<()>().await,
				}
			};

			tokio::select! {
				maybe_cmd = rx.recv() => {
					match maybe_cmd {
						Some(cmd) => self.handle_command(cmd).await,
						None => break, // every RoomHandle dropped; nothing left to serve
					}
				}
				_ = autosave.tick() => {
					self.autosave_tick().await;
				}
				() = alarm_sleep => {
					self.fire_alarm().await;
				}
			}
		}
	}

	fn instant_from_timestamp(ts: Timestamp) -> Instant {
		let delta_ms = ts.elapsed_ms_since(Timestamp::now());
		if delta_ms <= 0 {
			Instant::now()
		} else {
			#[allow(clippy::cast_sign_loss)]
			Instant::now() + Duration::from_millis(delta_ms as u64)
		}
	}

	fn ensure_loaded(&self) -> ClResult<()> {
		match &self.load_error {
			Some(err) => Err(Error::Internal(format!("room failed to load: {err}"))),
			None => Ok(()),
		}
	}

	async fn handle_command(&mut self, cmd: RoomCommand) {
		match cmd {
			RoomCommand::StateVector { reply } => {
				let _ = reply.send(self.doc.state_vector());
			}
			RoomCommand::SyncStep1 { state_vector, reply } => {
				let result = self.ensure_loaded().and_then(|()| self.doc.diff_since(&state_vector));
				let _ = reply.send(result);
			}
			RoomCommand::ClientUpdate { update, reply } => {
				let result = self.ensure_loaded().and_then(|()| {
					self.doc.apply_client_update(&update)?;
					self.dirty = true;
					Ok(())
				});
				let _ = reply.send(result);
			}
			RoomCommand::CurrentResetEpoch { reply } => {
				let _ = reply.send(self.state.reset_epoch);
			}
			RoomCommand::AddSharedReferences { refs, lease_ms, reply } => {
				let now = Timestamp::now();
				let mut newly_added = Vec::new();
				for (source_room_id, element_ids) in refs {
					let added = self.state.upsert_shared_ref(&source_room_id, &element_ids, lease_ms, now);
					if added {
						newly_added.push((source_room_id, element_ids));
					}
				}
				self.arm_alarm_if_needed();
				self.persist_state().await;
				let _ = reply.send(newly_added);
			}
			RoomCommand::SetSharedElements { elements, reply } => {
				self.state.set_permissions(&elements);
				self.persist_state().await;
				let _ = reply.send(());
			}
			RoomCommand::RegisterSharedElement { element_id, permission, reply } => {
				self.register_shared_element(element_id, permission).await;
				self.persist_state().await;
				let _ = reply.send(());
			}
			RoomCommand::Subscribe { consumer_room_id, element_ids, lease_ms, reply } => {
				let now = Timestamp::now();
				self.state.upsert_subscriber(&consumer_room_id, &element_ids, lease_ms, now);
				self.arm_alarm_if_needed();
				self.persist_state().await;
				let _ = reply.send(element_ids);
			}
			RoomCommand::ExportPermissions { element_ids, reply } => {
				let permissions = self
					.state
					.shared_permissions
					.iter()
					.filter(|(id, _)| element_ids.iter().any(|wanted| wanted == *id))
					.map(|(id, perm)| (id.clone(), *perm))
					.collect();
				let _ = reply.send(permissions);
			}
			RoomCommand::ApplySubtreesImmediate { body, reply } => {
				let result = self.apply_subtrees_immediate(body).await;
				let _ = reply.send(result);
			}
			RoomCommand::Inspect { reply } => {
				let result = self.inspect().await;
				let _ = reply.send(result);
			}
			RoomCommand::RawData { reply } => {
				let result = self.raw_data().await;
				let _ = reply.send(result);
			}
			RoomCommand::LiveCompare { reply } => {
				let result = self.live_compare().await;
				let _ = reply.send(result);
			}
			RoomCommand::RemoveSubscriber { consumer_room_id, reply } => {
				let removed = self.state.remove_subscriber(&consumer_room_id);
				if removed {
					self.persist_state().await;
				}
				let _ = reply.send(removed);
			}
			RoomCommand::ForceSaveLive { reply } => {
				let blob = self.doc.snapshot();
				let result = self.deps.persist.upsert(&self.room_id, &blob).await;
				if result.is_ok() {
					self.dirty = false;
				}
				let _ = reply.send(result);
			}
			RoomCommand::ForceReloadLive { reply } => {
				let result = match self.deps.persist.load(&self.room_id).await {
					Ok(Some(blob)) => self.doc.apply_client_update(&blob),
					Ok(None) => Ok(()),
					Err(err) => Err(err),
				};
				let _ = reply.send(result);
			}
			RoomCommand::HardReset { reply } => {
				let result = self.hard_reset().await;
				let _ = reply.send(result);
			}
			RoomCommand::RestoreRaw { snapshot_base64, bump_epoch, reply } => {
				let result = self.restore_raw(snapshot_base64, bump_epoch).await;
				let _ = reply.send(result);
			}
			RoomCommand::RegisterConnection { sender, reply } => {
				let id = self.next_conn_id;
				self.next_conn_id += 1;
				self.connections.insert(id, sender);
				let _ = reply.send(id);
			}
			RoomCommand::UnregisterConnection { id } => {
				self.connections.remove(&id);
			}
			RoomCommand::BroadcastRaw { from, message } => {
				for (id, sender) in &self.connections {
					if *id != from {
						let _ = sender.send(message.clone());
					}
				}
			}
			RoomCommand::DocUpdated { kind, delta } => {
				self.dirty = true;
				self.broadcast_update(&delta);
				self.on_doc_updated(kind).await;
			}
			RoomCommand::ReleaseSkipSave => {
				self.skip_save = false;
			}
		}
	}

	async fn persist_state(&self) {
		if let Err(err) = self.deps.room_store.save_state(&self.room_id, &self.state).await {
			tracing::warn!(room_id = %self.room_id, %err, "failed to persist room storage");
		}
	}

	/// Arms the alarm at `now + prune_interval` only if nothing earlier is
	/// already armed (SPEC_FULL.md §4.6: monotone scheduling).
	fn arm_alarm_if_needed(&mut self) {
		let candidate = Timestamp::from_now((self.deps.prune_interval_secs as i64) * 1000);
		let should_arm = match self.state.alarm_at {
			Some(existing) => candidate.millis() < existing.millis(),
			None => true,
		};
		if should_arm {
			self.state.alarm_at = Some(candidate);
		}
	}

	/// Fires the lease prune, rearming `state.alarm_at` for the next sweep (or
	/// clearing it to let the room go quiet until something re-arms it). The
	/// `run` loop re-reads `state.alarm_at` itself on its next iteration.
	async fn fire_alarm(&mut self) {
		let now = Timestamp::now();
		let anything_remains = self.state.prune_expired(now);
		self.state.alarm_at = if anything_remains {
			Some(Timestamp::from_now((self.deps.prune_interval_secs as i64) * 1000))
		} else {
			None
		};
		self.persist_state().await;
	}

	/// §4.5.5, `register-shared-element`: upsert the permission, then push
	/// the current value to any subscriber that pre-registered interest in
	/// this element before it was shared.
	async fn register_shared_element(&mut self, element_id: String, permission: Permission) {
		self.state.shared_permissions.insert(element_id.clone(), permission);

		let waiting: Vec<(RoomId, Vec<String>)> = self
			.state
			.subscribers
			.iter()
			.filter(|s| s.element_ids.iter().any(|id| id == &element_id))
			.map(|s| (s.consumer_room_id.clone(), vec![element_id.clone()]))
			.collect();

		for (consumer_room_id, ids) in waiting {
			let subtrees = self.doc.extract(&ids);
			if subtrees.is_empty() {
				continue; // element not yet written on this room's doc
			}
			self.dispatch_apply_subtrees(consumer_room_id, subtrees, OriginKindWire::Source);
		}
	}

	/// §4.5.3: receipt-side filtering and application of a bridge subtree
	/// push, plus the inline fanout a source performs after accepting a
	/// consumer's write.
	async fn apply_subtrees_immediate(&mut self, body: ApplySubtreesBody) -> ClResult<()> {
		self.ensure_loaded()?;

		if body.reset_epoch < self.state.reset_epoch {
			tracing::warn!(
				room_id = %self.room_id, sender = %body.sender, epoch = body.reset_epoch, stored = self.state.reset_epoch,
				"dropping stale-epoch bridge update"
			);
			return Ok(());
		}

		let is_subscriber = self.state.subscribers.iter().any(|s| s.consumer_room_id == body.sender);
		let matching_ref = self.state.shared_refs.iter().find(|r| r.source_room_id == body.sender).cloned();

		match (body.origin_kind, is_subscriber, matching_ref) {
			(OriginKindWire::Consumer, true, _) => {
				let existing_play = self.doc.play_as_json();
				let existing_play =
					existing_play.as_object().cloned().unwrap_or_default();
				let allow = bridge::source_receiving_from_consumer(&existing_play, &self.state.shared_permissions);
				self.doc.transact_with(Some(ORIGIN_C2S), |txn, play| {
					playhtml_crdt::value::assign_subtrees(txn, play, &body.subtrees, allow);
				});
				self.fanout_after_consumer_write(&body.sender);
			}
			(OriginKindWire::Source, _, Some(shared_ref)) => {
				let allow = bridge::consumer_receiving_from_source(&shared_ref.element_ids);
				self.doc.transact_with(Some(ORIGIN_S2C), |txn, play| {
					playhtml_crdt::value::assign_subtrees(txn, play, &body.subtrees, allow);
				});
			}
			_ => {
				tracing::warn!(
					room_id = %self.room_id, sender = %body.sender, kind = ?body.origin_kind,
					"bridge update from a room with no matching subscription relationship"
				);
			}
		}

		Ok(())
	}

	/// After a source applies a consumer's write, fan it out to every other
	/// subscriber, each filtered to its own requested element IDs
	/// (SPEC_FULL.md §4.5.3, last paragraph).
	fn fanout_after_consumer_write(&self, sender: &RoomId) {
		for subscriber in &self.state.subscribers {
			if &subscriber.consumer_room_id == sender {
				continue;
			}
			let ids = bridge::fanout_element_ids(&subscriber.element_ids, &self.state.shared_permissions);
			if ids.is_empty() {
				continue;
			}
			let subtrees = self.doc.extract(&ids);
			if subtrees.is_empty() {
				continue;
			}
			self.dispatch_apply_subtrees(subscriber.consumer_room_id.clone(), subtrees, OriginKindWire::Source);
		}
	}

	/// Relays a committed delta to every locally connected sync client,
	/// regardless of what caused it (a local client write, a bridge mirror,
	/// or a hard reset) — this is what makes the CRDT Host's doc actually
	/// shared across the room's own websocket connections (SPEC_FULL.md
	/// §4.4's "delegate the bidirectional sync stream"). Re-delivering a
	/// client its own update is harmless: applying an update a peer already
	/// has is a no-op on the CRDT, so this never causes a second observer
	/// firing or an echo loop.
	fn broadcast_update(&self, delta: &[u8]) {
		if self.connections.is_empty() {
			return;
		}
		let mut framed = Vec::with_capacity(delta.len() + 2);
		framed.push(MSG_OUTER_SYNC);
		framed.push(MSG_SYNC_UPDATE);
		framed.extend_from_slice(delta);
		for sender in self.connections.values() {
			let _ = sender.send(ConnMessage::Binary(framed.clone()));
		}
	}

	/// §4.5.4: the two observer loops, run after every genuinely local edit.
	/// Mirrors applied from a peer room (origin `ORIGIN_S2C`/`ORIGIN_C2S`)
	/// never re-enter here — that's the whole echo-suppression mechanism.
	async fn on_doc_updated(&self, kind: OriginKind) {
		if kind != OriginKind::Local {
			return;
		}

		for subscriber in &self.state.subscribers {
			if subscriber.element_ids.is_empty() {
				continue;
			}
			let ids = bridge::fanout_element_ids(&subscriber.element_ids, &self.state.shared_permissions);
			if ids.is_empty() {
				continue;
			}
			let subtrees = self.doc.extract(&ids);
			if subtrees.is_empty() {
				continue;
			}
			self.dispatch_apply_subtrees(subscriber.consumer_room_id.clone(), subtrees, OriginKindWire::Source);
		}

		for shared_ref in &self.state.shared_refs {
			if shared_ref.element_ids.is_empty() {
				continue;
			}
			let subtrees = self.doc.extract(&shared_ref.element_ids);
			if subtrees.is_empty() {
				continue;
			}
			self.dispatch_apply_subtrees(shared_ref.source_room_id.clone(), subtrees, OriginKindWire::Consumer);
		}
	}

	/// Dispatches `apply-subtrees-immediate` to `target` through the
	/// in-process registry, concurrently and best-effort: failures are
	/// logged and dropped per SPEC_FULL.md §5 ("self-healing via the next
	/// observer event").
	fn dispatch_apply_subtrees(
		&self,
		target: RoomId,
		subtrees: serde_json::Map<String, serde_json::Value>,
		origin_kind: OriginKindWire,
	) {
		let Some(registry) = self.deps.registry.upgrade() else { return };
		let sender = self.room_id.clone();
		let reset_epoch = self.state.reset_epoch;
		tokio::spawn(async move {
			let handle = registry.get_or_create(&target).await;
			let body = ApplySubtreesBody { subtrees, sender, origin_kind, reset_epoch };
			match handle.apply_subtrees_immediate(body).await {
				Ok(Ok(())) => {}
				Ok(Err(err)) => tracing::warn!(target_room = %handle.room_id(), %err, "bridge target rejected update"),
				Err(err) => tracing::warn!(target_room = %handle.room_id(), %err, "bridge rpc failed"),
			}
		});
	}

	async fn autosave_tick(&mut self) {
		if !self.dirty || self.skip_save {
			return;
		}
		let doc_epoch = self.doc.reset_epoch();
		if doc_epoch.is_none_or(|epoch| epoch < self.state.reset_epoch) {
			tracing::warn!(
				room_id = %self.room_id, doc_epoch = ?doc_epoch, stored_epoch = self.state.reset_epoch,
				"skipping autosave: stale generation"
			);
			return;
		}
		let blob = self.doc.snapshot();
		match self.deps.persist.upsert(&self.room_id, &blob).await {
			Ok(()) => self.dirty = false,
			Err(err) => tracing::warn!(room_id = %self.room_id, %err, "autosave failed, retrying next tick"),
		}
	}

	async fn inspect(&self) -> ClResult<InspectResponse> {
		let play = match self.deps.persist.load(&self.room_id).await? {
			Some(blob) => Some(PlayDoc::from_snapshot(&blob)?.play_as_json()),
			None => None,
		};
		Ok(InspectResponse {
			subscribers: self.state.subscribers.clone(),
			shared_refs: self.state.shared_refs.clone(),
			shared_permissions: self.state.shared_permissions.clone(),
			reset_epoch: self.state.reset_epoch,
			connection_count: self.connections.len(),
			play,
		})
	}

	async fn raw_data(&self) -> ClResult<RawDataResponse> {
		let blob = self.deps.persist.load(&self.room_id).await?.ok_or(Error::NotFound)?;
		Ok(RawDataResponse {
			document_base64: base64::engine::general_purpose::STANDARD.encode(blob),
			reset_epoch: self.state.reset_epoch,
		})
	}

	async fn live_compare(&self) -> ClResult<LiveCompareResponse> {
		let direct = match self.deps.persist.load(&self.room_id).await? {
			Some(blob) => PlayDoc::from_snapshot(&blob)?.play_as_json(),
			None => serde_json::Value::Object(serde_json::Map::new()),
		};
		let live = self.doc.play_as_json();

		let direct_keys: Vec<String> = direct.as_object().map(|m| m.keys().cloned().collect()).unwrap_or_default();
		let live_keys: Vec<String> = live.as_object().map(|m| m.keys().cloned().collect()).unwrap_or_default();

		let direct_only_tags = direct_keys.iter().filter(|k| !live_keys.contains(*k)).cloned().collect();
		let live_only_tags = live_keys.iter().filter(|k| !direct_keys.contains(*k)).cloned().collect();

		Ok(LiveCompareResponse { equal: direct == live, direct_only_tags, live_only_tags })
	}

	/// §4.7 `hard-reset`: atomically rebuild the live document as a
	/// history-free copy of its current logical state, bump the epoch, and
	/// boot every connection so clients reload against the new generation.
	async fn hard_reset(&mut self) -> ClResult<HardResetResponse> {
		self.skip_save = true;

		let play_json = self.doc.play_as_json();
		let play_map = play_json.as_object().cloned().unwrap_or_default();
		let new_epoch = Timestamp::now().millis();

		let fresh = PlayDoc::new();
		fresh.replace_with_logical_snapshot(&play_map, new_epoch);
		let blob = fresh.snapshot();

		if let Err(err) = self.deps.persist.upsert(&self.room_id, &blob).await {
			self.schedule_release_skip_save();
			return Err(err);
		}

		self.swap_in(fresh);
		self.state.reset_epoch = new_epoch;
		self.persist_state().await;
		self.broadcast_reset(new_epoch, 4000, "Room Reset by Admin");
		self.schedule_release_skip_save();

		Ok(HardResetResponse { reset_epoch: new_epoch })
	}

	/// §4.7 `restore-raw`: same atomic swap, sourced from an externally
	/// supplied snapshot instead of this room's own current state.
	async fn restore_raw(&mut self, snapshot_base64: String, bump_epoch: bool) -> ClResult<HardResetResponse> {
		let bytes = base64::engine::general_purpose::STANDARD.decode(&snapshot_base64)?;
		let fresh = PlayDoc::from_snapshot(&bytes)?;

		let new_epoch = if bump_epoch {
			let epoch = Timestamp::now().millis();
			fresh.set_reset_epoch(epoch, None);
			epoch
		} else {
			fresh.reset_epoch().unwrap_or_else(|| Timestamp::now().millis())
		};

		self.skip_save = true;
		let blob = fresh.snapshot();
		if let Err(err) = self.deps.persist.upsert(&self.room_id, &blob).await {
			self.schedule_release_skip_save();
			return Err(err);
		}

		self.swap_in(fresh);
		self.state.reset_epoch = new_epoch;
		self.persist_state().await;
		self.broadcast_reset(new_epoch, 4000, "Room Restored by Admin");
		self.schedule_release_skip_save();

		Ok(HardResetResponse { reset_epoch: new_epoch })
	}

	/// Swaps `self.doc` for `new_doc`, re-attaching the update observer so
	/// future edits on the new generation still drive the bridge.
	fn swap_in(&mut self, new_doc: PlayDoc) {
		let sub_tx = self.self_tx.clone();
		let sub = new_doc.observe_update(move |delta, kind| {
			let _ = sub_tx.send(RoomCommand::DocUpdated { kind, delta: delta.to_vec() });
		});
		self.doc = new_doc;
		self._update_sub = Some(sub);
		self.dirty = false;
	}

	fn broadcast_reset(&mut self, new_epoch: i64, close_code: u16, close_reason: &str) {
		let payload = serde_json::json!({
			"type": "room-reset",
			"timestamp": Timestamp::now().millis(),
			"resetEpoch": new_epoch,
		});
		let Ok(text) = serde_json::to_string(&payload) else { return };
		for sender in self.connections.values() {
			let _ = sender.send(ConnMessage::Text(text.clone()));
			let _ = sender.send(ConnMessage::Close { code: close_code, reason: close_reason.to_string() });
		}
		self.connections.clear();
	}

	fn schedule_release_skip_save(&self) {
		let tx = self.self_tx.clone();
		tokio::spawn(async move {
			tokio::time::sleep(SKIP_SAVE_SETTLE).await;
			let _ = tx.send(RoomCommand::ReleaseSkipSave);
		});
	}
}
