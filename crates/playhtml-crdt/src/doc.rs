//! `PlayDoc`: one in-memory CRDT document per room.

use std::sync::Mutex;

use playhtml_types::{ClResult, Error};
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, MapRef, Origin, ReadTxn, StateVector, Subscription, Transact, TransactionMut, Update};

use crate::origin::OriginKind;
use crate::value;

/// Wraps a `yrs::Doc` exposing exactly the `play`/`meta` root shape this
/// schema relies on (see SPEC_FULL.md §3, §4.3.1).
pub struct PlayDoc {
	doc: Doc,
	play: MapRef,
	meta: MapRef,
}

impl PlayDoc {
	pub fn new() -> Self {
		let doc = Doc::new();
		let play = doc.get_or_insert_map("play");
		let meta = doc.get_or_insert_map("meta");
		Self { doc, play, meta }
	}

	/// Loads a previously persisted full-state snapshot (produced by
	/// [`Self::snapshot`]) into a fresh document.
	pub fn from_snapshot(bytes: &[u8]) -> ClResult<Self> {
		let instance = Self::new();
		if !bytes.is_empty() {
			instance.apply_encoded_update(bytes, None)?;
		}
		Ok(instance)
	}

	/// Full-state encode suitable for persistence (not an incremental diff).
	pub fn snapshot(&self) -> Vec<u8> {
		let txn = self.doc.transact();
		txn.encode_state_as_update_v1(&StateVector::default())
	}

	pub fn state_vector(&self) -> Vec<u8> {
		let txn = self.doc.transact();
		txn.state_vector().encode_v1()
	}

	/// Sync-step-2 style diff against a client's state vector.
	pub fn diff_since(&self, client_state_vector: &[u8]) -> ClResult<Vec<u8>> {
		let sv = StateVector::decode_v1(client_state_vector)
			.map_err(|e| Error::ValidationError(format!("invalid state vector: {e}")))?;
		let txn = self.doc.transact();
		Ok(txn.encode_state_as_update_v1(&sv))
	}

	/// Applies a raw client sync-protocol update with no origin tag (a
	/// genuine local edit coming straight off a client's websocket).
	pub fn apply_client_update(&self, update_bytes: &[u8]) -> ClResult<()> {
		self.apply_encoded_update(update_bytes, None)
	}

	/// Applies an update tagged with `origin`, for mirrored bridge writes.
	pub fn apply_update_with_origin(&self, update_bytes: &[u8], origin: &'static [u8]) -> ClResult<()> {
		self.apply_encoded_update(update_bytes, Some(origin))
	}

	fn apply_encoded_update(&self, bytes: &[u8], origin: Option<&'static [u8]>) -> ClResult<()> {
		let update = Update::decode_v1(bytes)
			.map_err(|e| Error::ValidationError(format!("invalid crdt update: {e}")))?;
		let mut txn = match origin {
			Some(origin) => self.doc.transact_mut_with(Origin::from(origin)),
			None => self.doc.transact_mut(),
		};
		txn.apply_update(update).map_err(|e| Error::Internal(format!("apply_update failed: {e}")))?;
		Ok(())
	}

	/// Runs `f` inside a write transaction tagged with `origin` (or
	/// untagged for local edits), returning whatever `f` returns.
	pub fn transact_with<R>(
		&self,
		origin: Option<&'static [u8]>,
		f: impl FnOnce(&mut TransactionMut, &MapRef) -> R,
	) -> R {
		let mut txn = match origin {
			Some(origin) => self.doc.transact_mut_with(Origin::from(origin)),
			None => self.doc.transact_mut(),
		};
		f(&mut txn, &self.play)
	}

	pub fn extract(&self, ids: &[String]) -> serde_json::Map<String, serde_json::Value> {
		let txn = self.doc.transact();
		value::extract_subtrees(&txn, &self.play, ids)
	}

	/// Registers an update observer. `f` receives the encoded update bytes
	/// and the transaction's origin classification so the bridge can decide
	/// whether to mirror it onward.
	pub fn observe_update<F>(&self, f: F) -> Subscription
	where
		F: FnMut(&[u8], OriginKind) + Send + 'static,
	{
		let f = Mutex::new(f);
		self.doc.observe_update_v1(move |txn, event| {
			let kind = crate::origin::classify(txn.origin().map(yrs::Origin::as_ref));
			if let Ok(mut callback) = f.lock() {
				callback(&event.update, kind);
			}
		})
	}

	pub fn reset_epoch(&self) -> Option<i64> {
		let txn = self.doc.transact();
		match self.meta.get(&txn, "resetEpoch") {
			Some(yrs::types::Value::Any(yrs::Any::Number(n))) => Some(n as i64),
			Some(yrs::types::Value::Any(yrs::Any::BigInt(n))) => Some(n),
			_ => None,
		}
	}

	pub fn set_reset_epoch(&self, epoch: i64, origin: Option<&'static [u8]>) {
		self.transact_with(origin, |txn, _play| {
			self.meta.insert(txn, "resetEpoch", epoch);
		});
	}

	/// Rebuilds this document's `play` map from scratch out of a plain JSON
	/// snapshot of its logical contents, discarding all CRDT history/
	/// tombstones. Used by the admin hard-reset/restore-raw operations.
	pub fn replace_with_logical_snapshot(
		&self,
		play_json: &serde_json::Map<String, serde_json::Value>,
		new_epoch: i64,
	) {
		let mut txn = self.doc.transact_mut();
		let stale_tags: Vec<String> = self.play.iter(&txn).map(|(k, _)| k.to_string()).collect();
		for tag in stale_tags {
			self.play.remove(&mut txn, &tag);
		}
		value::assign_subtrees(&mut txn, &self.play, play_json, |_, _| true);
		self.meta.insert(&mut txn, "resetEpoch", new_epoch);
	}

	pub fn play_as_json(&self) -> serde_json::Value {
		let txn = self.doc.transact();
		let mut obj = serde_json::Map::new();
		for (tag, tag_value) in self.play.iter(&txn) {
			obj.insert(tag.to_string(), value::extract_value(&txn, tag_value));
		}
		serde_json::Value::Object(obj)
	}
}

impl Default for PlayDoc {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_round_trips() {
		let doc = PlayDoc::new();
		doc.transact_with(None, |txn, play| {
			let subtrees: serde_json::Map<String, serde_json::Value> =
				serde_json::from_value(serde_json::json!({"toggle": {"e1": {"on": true}}})).unwrap();
			value::assign_subtrees(txn, play, &subtrees, |_, _| true);
		});
		let snap = doc.snapshot();

		let restored = PlayDoc::from_snapshot(&snap).unwrap();
		let extracted = restored.extract(&["e1".to_string()]);
		assert_eq!(extracted["toggle"]["e1"]["on"], serde_json::json!(true));
	}

	#[test]
	fn origin_tags_are_reported_to_observer() {
		use std::sync::{Arc, Mutex as StdMutex};

		let doc = PlayDoc::new();
		let seen = Arc::new(StdMutex::new(Vec::new()));
		let seen_clone = seen.clone();
		let _sub = doc.observe_update(move |_delta, kind| {
			if let Ok(mut v) = seen_clone.lock() {
				v.push(kind);
			}
		});

		doc.transact_with(Some(crate::origin::ORIGIN_S2C), |txn, play| {
			play.insert(txn, "marker", true);
		});

		let kinds = seen.lock().unwrap();
		assert_eq!(kinds.len(), 1);
		assert_eq!(kinds[0], OriginKind::SourceToConsumer);
	}
}
