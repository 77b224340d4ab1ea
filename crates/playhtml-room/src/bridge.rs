//! The cross-room subscription bridge (SPEC_FULL.md §4.5): wire types for
//! the room-to-room RPC surface plus the pure filtering rules applied on
//! receipt. The RPCs themselves are dispatched by [`crate::registry`]
//! through the in-process [`crate::registry::RoomRegistry`] mailbox.

use std::collections::HashMap;

use playhtml_types::RoomId;
use serde::{Deserialize, Serialize};

use crate::model::Permission;

/// Who sent an `apply-subtrees-immediate` call, from the recipient's point
/// of view — mirrors the two observer loops in §4.5.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKindWire {
	/// The sender is a consumer of ours (it is pushing its local edits).
	Consumer,
	/// The sender is a source we subscribe to (it is pushing its updates).
	Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySubtreesBody {
	pub subtrees: serde_json::Map<String, serde_json::Value>,
	pub sender: RoomId,
	pub origin_kind: OriginKindWire,
	pub reset_epoch: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
	pub ok: bool,
	pub subscribed: bool,
	pub element_ids: Vec<String>,
}

/// §4.5.3, first rule: the recipient is acting as a *source* relative to
/// `sender`, and the message came from a subscribed consumer pushing its own
/// edits. Drop anything not already present, and anything not exactly
/// read-write.
pub fn source_receiving_from_consumer<'a>(
	existing_play: &'a serde_json::Map<String, serde_json::Value>,
	permissions: &'a HashMap<String, Permission>,
) -> impl Fn(&str, &str) -> bool + 'a {
	move |tag, element_id| {
		let already_present = existing_play
			.get(tag)
			.and_then(serde_json::Value::as_object)
			.is_some_and(|m| m.contains_key(element_id));
		let writable = permissions.get(element_id).is_some_and(|p| p.is_read_write());
		already_present && writable
	}
}

/// §4.5.3, second rule: the recipient is acting as a *consumer* relative to
/// `sender`, and the message came from a source it subscribes to. Drop
/// anything outside the matching `SharedRefEntry`'s element IDs.
pub fn consumer_receiving_from_source(allowed_ids: &[String]) -> impl Fn(&str, &str) -> bool + '_ {
	move |_tag, element_id| allowed_ids.iter().any(|id| id == element_id)
}

/// §4.5.4, source fanout: only elements that are both requested by the
/// subscriber and currently shared propagate.
pub fn fanout_element_ids(subscriber_elements: &[String], permissions: &HashMap<String, Permission>) -> Vec<String> {
	subscriber_elements.iter().filter(|id| permissions.contains_key(id.as_str())).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	#[test]
	fn source_drops_unshared_and_readonly() {
		let play: serde_json::Map<String, serde_json::Value> =
			serde_json::from_value(serde_json::json!({"toggle": {"e1": {"on": false}}})).unwrap();
		let mut perms = HashMap::new();
		perms.insert("e1".to_string(), Permission::ReadOnly);
		perms.insert("e2".to_string(), Permission::ReadWrite);

		let allow = source_receiving_from_consumer(&play, &perms);
		assert!(!allow("toggle", "e1")); // read-only
		assert!(!allow("toggle", "e2")); // not already present
	}

	#[test]
	fn source_allows_shared_read_write_existing() {
		let play: serde_json::Map<String, serde_json::Value> =
			serde_json::from_value(serde_json::json!({"toggle": {"e1": {"on": false}}})).unwrap();
		let mut perms = HashMap::new();
		perms.insert("e1".to_string(), Permission::ReadWrite);

		let allow = source_receiving_from_consumer(&play, &perms);
		assert!(allow("toggle", "e1"));
	}

	#[test]
	fn fanout_is_per_subscriber() {
		let mut perms = HashMap::new();
		perms.insert("e1".to_string(), Permission::ReadWrite);
		let ids = fanout_element_ids(&["e1".to_string(), "e2".to_string()], &perms);
		assert_eq!(ids, vec!["e1".to_string()]);
	}
}
