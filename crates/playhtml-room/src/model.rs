//! Room data model (SPEC_FULL.md §3): subscribers, outgoing references and
//! per-element permissions, all stored per-room alongside the CRDT.

use std::collections::HashMap;

use playhtml_types::{RoomId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
	ReadOnly,
	ReadWrite,
}

impl Permission {
	pub fn is_read_write(self) -> bool {
		matches!(self, Permission::ReadWrite)
	}
}

/// Recorded on a source room for each consumer that has subscribed to some
/// of its elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
	pub consumer_room_id: RoomId,
	pub element_ids: Vec<String>,
	pub created_at: Timestamp,
	pub last_seen: Timestamp,
	pub lease_ms: i64,
}

impl Subscriber {
	pub fn is_expired(&self, now: Timestamp) -> bool {
		now.elapsed_ms_since(self.last_seen) > self.lease_ms
	}
}

/// Recorded on a consumer room for each source it wants elements from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedRefEntry {
	pub source_room_id: RoomId,
	pub element_ids: Vec<String>,
	pub last_seen: Timestamp,
	pub lease_ms: i64,
}

impl SharedRefEntry {
	pub fn is_expired(&self, now: Timestamp) -> bool {
		now.elapsed_ms_since(self.last_seen) > self.lease_ms
	}
}

/// Per-room durable state, separate from the CRDT document itself (Room
/// Storage, SPEC_FULL.md §4.2's sibling).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomState {
	pub subscribers: Vec<Subscriber>,
	pub shared_refs: Vec<SharedRefEntry>,
	pub shared_permissions: HashMap<String, Permission>,
	pub reset_epoch: i64,
	pub alarm_at: Option<Timestamp>,
}

impl RoomState {
	pub fn upsert_subscriber(&mut self, consumer_room_id: &RoomId, element_ids: &[String], lease_ms: i64, now: Timestamp) {
		if let Some(existing) = self.subscribers.iter_mut().find(|s| &s.consumer_room_id == consumer_room_id) {
			for id in element_ids {
				if !existing.element_ids.iter().any(|e| e == id) {
					existing.element_ids.push(id.clone());
				}
			}
			existing.last_seen = now;
		} else {
			self.subscribers.push(Subscriber {
				consumer_room_id: consumer_room_id.clone(),
				element_ids: element_ids.to_vec(),
				created_at: now,
				last_seen: now,
				lease_ms,
			});
		}
	}

	pub fn upsert_shared_ref(&mut self, source_room_id: &RoomId, element_ids: &[String], lease_ms: i64, now: Timestamp) -> bool {
		if let Some(existing) = self.shared_refs.iter_mut().find(|r| &r.source_room_id == source_room_id) {
			let mut added = false;
			for id in element_ids {
				if !existing.element_ids.iter().any(|e| e == id) {
					existing.element_ids.push(id.clone());
					added = true;
				}
			}
			existing.last_seen = now;
			added
		} else {
			self.shared_refs.push(SharedRefEntry {
				source_room_id: source_room_id.clone(),
				element_ids: element_ids.to_vec(),
				last_seen: now,
				lease_ms,
			});
			true
		}
	}

	pub fn remove_subscriber(&mut self, consumer_room_id: &RoomId) -> bool {
		let before = self.subscribers.len();
		self.subscribers.retain(|s| &s.consumer_room_id != consumer_room_id);
		before != self.subscribers.len()
	}

	/// Drops subscribers/refs past their lease (Lease & Alarm Manager, §4.6).
	/// Returns whether anything with a lease still remains (the caller uses
	/// this to decide whether to reschedule the alarm).
	pub fn prune_expired(&mut self, now: Timestamp) -> bool {
		self.subscribers.retain(|s| !s.is_expired(now));
		self.shared_refs.retain(|r| !r.is_expired(now));
		!self.subscribers.is_empty() || !self.shared_refs.is_empty()
	}

	pub fn set_permissions(&mut self, elements: &[(String, Permission)]) {
		self.shared_permissions = elements.iter().cloned().collect();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn room_id(s: &str) -> RoomId {
		RoomId::new(s)
	}

	#[test]
	fn subscriber_past_lease_is_expired() {
		let now = Timestamp::now();
		let sub = Subscriber {
			consumer_room_id: room_id("consumer"),
			element_ids: vec!["e1".into()],
			created_at: Timestamp::from_now(-13 * 3600 * 1000),
			last_seen: Timestamp::from_now(-13 * 3600 * 1000),
			lease_ms: 12 * 3600 * 1000,
		};
		assert!(sub.is_expired(now));
	}

	#[test]
	fn subscriber_within_lease_survives() {
		let now = Timestamp::now();
		let sub = Subscriber {
			consumer_room_id: room_id("consumer"),
			element_ids: vec!["e1".into()],
			created_at: Timestamp::from_now(-11 * 3600 * 1000),
			last_seen: Timestamp::from_now(-11 * 3600 * 1000),
			lease_ms: 12 * 3600 * 1000,
		};
		assert!(!sub.is_expired(now));
	}

	#[test]
	fn prune_expired_removes_only_stale_entries() {
		let mut state = RoomState::default();
		state.upsert_subscriber(&room_id("stale"), &["e1".into()], 12 * 3600 * 1000, Timestamp::from_now(-13 * 3600 * 1000));
		state.upsert_subscriber(&room_id("fresh"), &["e1".into()], 12 * 3600 * 1000, Timestamp::from_now(-11 * 3600 * 1000));
		state.upsert_shared_ref(&room_id("stale-ref"), &["e1".into()], 12 * 3600 * 1000, Timestamp::from_now(-13 * 3600 * 1000));

		let has_remaining = state.prune_expired(Timestamp::now());

		assert!(has_remaining);
		assert_eq!(state.subscribers.len(), 1);
		assert_eq!(state.subscribers[0].consumer_room_id, room_id("fresh"));
		assert!(state.shared_refs.is_empty());
	}

	#[test]
	fn prune_expired_reports_nothing_remaining_once_all_stale() {
		let mut state = RoomState::default();
		state.upsert_subscriber(&room_id("stale"), &["e1".into()], 12 * 3600 * 1000, Timestamp::from_now(-13 * 3600 * 1000));

		assert!(!state.prune_expired(Timestamp::now()));
		assert!(state.subscribers.is_empty());
	}

	#[test]
	fn upsert_subscriber_merges_element_ids_and_renews_last_seen() {
		let mut state = RoomState::default();
		let first_seen = Timestamp::from_now(-1000);
		state.upsert_subscriber(&room_id("consumer"), &["e1".into()], 1000, first_seen);
		let renewed = Timestamp::now();
		state.upsert_subscriber(&room_id("consumer"), &["e2".into()], 1000, renewed);

		assert_eq!(state.subscribers.len(), 1);
		let sub = &state.subscribers[0];
		assert_eq!(sub.element_ids, vec!["e1".to_string(), "e2".to_string()]);
		assert_eq!(sub.last_seen, renewed);
		assert_eq!(sub.created_at, first_seen);
	}

	#[test]
	fn set_permissions_replaces_rather_than_merges() {
		let mut state = RoomState::default();
		state.set_permissions(&[("e1".into(), Permission::ReadWrite), ("e2".into(), Permission::ReadOnly)]);
		state.set_permissions(&[("e2".into(), Permission::ReadWrite)]);

		assert_eq!(state.shared_permissions.len(), 1);
		assert_eq!(state.shared_permissions.get("e2"), Some(&Permission::ReadWrite));
		assert!(!state.shared_permissions.contains_key("e1"));
	}
}
