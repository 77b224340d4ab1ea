//! Conversions between the plain JSON-compatible data the bridge and admin
//! surfaces speak (`serde_json::Value`) and the live, nested CRDT shared
//! types that back the `play` map (`tag -> elementId -> value`).
//!
//! Assignment mutates existing nested maps/arrays in place instead of
//! replacing them wholesale, so that any live observer attached to a
//! sub-node survives an update that only touches a sibling field.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use yrs::types::Value as YrsValue;
use yrs::{Any, Array, ArrayPrelim, ArrayRef, Map, MapPrelim, MapRef, ReadTxn, TransactionMut};

/// Converts a `serde_json::Value` into the equivalent `yrs::Any` literal.
/// Nested objects/arrays become `Any::Map`/`Any::Array` — only suitable for
/// values that will never need independent shared-type children (use
/// [`insert_json`] when children must stay individually observable).
pub fn json_to_any(value: &JsonValue) -> Any {
	match value {
		JsonValue::Null => Any::Null,
		JsonValue::Bool(b) => Any::Bool(*b),
		JsonValue::Number(n) => Any::Number(n.as_f64().unwrap_or(0.0)),
		JsonValue::String(s) => Any::String(Arc::from(s.as_str())),
		JsonValue::Array(items) => {
			let converted: Vec<Any> = items.iter().map(json_to_any).collect();
			Any::Array(converted.into())
		}
		JsonValue::Object(obj) => {
			let converted: HashMap<String, Any> =
				obj.iter().map(|(k, v)| (k.clone(), json_to_any(v))).collect();
			Any::Map(Box::new(converted).into())
		}
	}
}

pub fn any_to_json(value: &Any) -> JsonValue {
	match value {
		Any::Null | Any::Undefined => JsonValue::Null,
		Any::Bool(b) => JsonValue::Bool(*b),
		Any::Number(n) => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
		Any::BigInt(n) => JsonValue::Number((*n).into()),
		Any::String(s) => JsonValue::String(s.to_string()),
		Any::Buffer(bytes) => JsonValue::String(base64_encode(bytes)),
		Any::Array(items) => JsonValue::Array(items.iter().map(any_to_json).collect()),
		Any::Map(map) => {
			let mut obj = JsonMap::new();
			for (k, v) in map.iter() {
				obj.insert(k.clone(), any_to_json(v));
			}
			JsonValue::Object(obj)
		}
	}
}

fn base64_encode(bytes: &[u8]) -> String {
	use base64::Engine;
	base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Reads a live CRDT value (possibly a nested shared type) into plain JSON.
pub fn extract_value<T: ReadTxn>(txn: &T, value: YrsValue) -> JsonValue {
	match value {
		YrsValue::Any(any) => any_to_json(&any),
		YrsValue::YMap(map) => {
			let mut obj = JsonMap::new();
			for (key, val) in map.iter(txn) {
				obj.insert(key.to_string(), extract_value(txn, val));
			}
			JsonValue::Object(obj)
		}
		YrsValue::YArray(arr) => {
			let items = arr.iter(txn).map(|v| extract_value(txn, v)).collect();
			JsonValue::Array(items)
		}
		// Text/XML shared types never appear under `play`; this schema
		// only ever nests maps, arrays and plain literals.
		_ => JsonValue::Null,
	}
}

/// `extract(doc, ids) -> { tag -> { elementId -> value } }`, restricted to
/// the requested element IDs, as an already-flattened JSON object ready to
/// ship on the bridge's RPC wire.
pub fn extract_subtrees<T: ReadTxn>(txn: &T, play: &MapRef, ids: &[String]) -> JsonMap<String, JsonValue> {
	let mut result = JsonMap::new();
	for (tag, tag_value) in play.iter(txn) {
		let YrsValue::YMap(tag_map) = tag_value else { continue };
		let mut elements = JsonMap::new();
		for (element_id, element_value) in tag_map.iter(txn) {
			if ids.iter().any(|id| id == element_id) {
				elements.insert(element_id.to_string(), extract_value(txn, element_value));
			}
		}
		if !elements.is_empty() {
			result.insert(tag.to_string(), JsonValue::Object(elements));
		}
	}
	result
}

/// Applies `{ tag -> { elementId -> value } }` onto `play`, creating nested
/// shared types for new entries and diff-applying in place for existing
/// ones. `allow` gates each `(tag, elementId)` pair independently so callers
/// can fold in the permission/subscription filtering rules from the bridge.
pub fn assign_subtrees(
	txn: &mut TransactionMut,
	play: &MapRef,
	subtrees: &JsonMap<String, JsonValue>,
	allow: impl Fn(&str, &str) -> bool,
) {
	for (tag, elements) in subtrees {
		let Some(elements) = elements.as_object() else { continue };
		if elements.keys().all(|element_id| !allow(tag, element_id)) {
			continue;
		}
		let tag_map = get_or_create_map(txn, play, tag);
		for (element_id, new_value) in elements {
			if !allow(tag, element_id) {
				continue;
			}
			assign_in_place(txn, &tag_map, element_id, new_value);
		}
	}
}

fn get_or_create_map(txn: &mut TransactionMut, parent: &MapRef, key: &str) -> MapRef {
	if let Some(YrsValue::YMap(existing)) = parent.get(txn, key) {
		return existing;
	}
	parent.insert(txn, key, MapPrelim::default())
}

/// Assigns `new_value` at `key` within `parent`, mutating an existing nested
/// map in place (so observers attached to it survive), replacing arrays
/// wholesale, and skipping primitive writes that are already equal.
fn assign_in_place(txn: &mut TransactionMut, parent: &MapRef, key: &str, new_value: &JsonValue) {
	let existing = parent.get(txn, key);
	match new_value {
		JsonValue::Object(obj) => {
			if let Some(YrsValue::YMap(existing_map)) = existing {
				diff_apply_map(txn, &existing_map, obj);
			} else {
				let fresh: MapRef = parent.insert(txn, key, MapPrelim::default());
				diff_apply_map(txn, &fresh, obj);
			}
		}
		JsonValue::Array(items) => {
			// Arrays are always replaced in full, never diffed element-wise.
			let fresh: ArrayRef = parent.insert(txn, key, ArrayPrelim::default());
			for item in items {
				push_json(txn, &fresh, item);
			}
		}
		primitive => {
			let new_any = json_to_any(primitive);
			let unchanged = matches!(&existing, Some(YrsValue::Any(current)) if *current == new_any);
			if !unchanged {
				parent.insert(txn, key, new_any);
			}
		}
	}
}

fn diff_apply_map(txn: &mut TransactionMut, map: &MapRef, new_obj: &JsonMap<String, JsonValue>) {
	let stale_keys: Vec<String> =
		map.iter(txn).map(|(k, _)| k.to_string()).filter(|k| !new_obj.contains_key(k)).collect();
	for key in stale_keys {
		map.remove(txn, &key);
	}
	for (key, value) in new_obj {
		assign_in_place(txn, map, key, value);
	}
}

fn push_json(txn: &mut TransactionMut, array: &ArrayRef, value: &JsonValue) {
	match value {
		JsonValue::Object(obj) => {
			let sub: MapRef = array.push_back(txn, MapPrelim::default());
			for (key, val) in obj {
				assign_in_place(txn, &sub, key, val);
			}
		}
		JsonValue::Array(items) => {
			let sub: ArrayRef = array.push_back(txn, ArrayPrelim::default());
			for item in items {
				push_json(txn, &sub, item);
			}
		}
		primitive => {
			array.push_back(txn, json_to_any(primitive));
		}
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use yrs::{Doc, Transact};

	#[test]
	fn json_any_round_trip() {
		let value = serde_json::json!({"on": true, "count": 3, "tags": ["a", "b"]});
		let any = json_to_any(&value);
		let back = any_to_json(&any);
		assert_eq!(value, back);
	}

	#[test]
	fn extract_then_assign_is_noop() {
		let doc = Doc::new();
		let play = doc.get_or_insert_map("play");
		{
			let mut txn = doc.transact_mut();
			let tag_map: MapRef = play.insert(&mut txn, "toggle", MapPrelim::default());
			let elem: MapRef = tag_map.insert(&mut txn, "e1", MapPrelim::default());
			elem.insert(&mut txn, "on", false);
		}

		let extracted = {
			let txn = doc.transact();
			extract_subtrees(&txn, &play, &["e1".to_string()])
		};
		assert_eq!(extracted["toggle"]["e1"]["on"], serde_json::json!(false));

		{
			let mut txn = doc.transact_mut();
			assign_subtrees(&mut txn, &play, &extracted, |_, _| true);
		}

		let extracted_again = {
			let txn = doc.transact();
			extract_subtrees(&txn, &play, &["e1".to_string()])
		};
		assert_eq!(extracted, extracted_again);
	}

	#[test]
	fn assign_creates_missing_element() {
		let doc = Doc::new();
		let play = doc.get_or_insert_map("play");
		let subtrees: JsonMap<String, JsonValue> =
			serde_json::from_value(serde_json::json!({"toggle": {"e2": {"on": true}}})).unwrap();

		{
			let mut txn = doc.transact_mut();
			assign_subtrees(&mut txn, &play, &subtrees, |_, _| true);
		}

		let txn = doc.transact();
		let extracted = extract_subtrees(&txn, &play, &["e2".to_string()]);
		assert_eq!(extracted["toggle"]["e2"]["on"], serde_json::json!(true));
	}
}
