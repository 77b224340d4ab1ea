//! Room ID Normalizer (SPEC_FULL.md §4.1).
//!
//! Canonicalizes a `(host, path)` pair into the room ID every other
//! component keys its storage by, and flags strings that can never be a
//! valid room.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use playhtml_types::RoomId;

/// Escapes everything a bare URL fragment would, plus `/`: the combined
/// `host-path` string must collapse to a single path segment so a canonical
/// [`RoomId`] can always be carried as one URL/key component with no nested
/// separators (e.g. as a single `axum` path parameter, or a `redb` key).
const FRAGMENT: &AsciiSet =
	&CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`').add(b'?').add(b'#').add(b'/');

/// Canonicalizes `host` and `path` into a room ID. Never fails: inputs too
/// malformed to mean anything collapse onto a stable `"invalid"` path
/// component rather than panicking, so callers can still decide via
/// [`is_invalid_room_id`] whether to reject the connection.
pub fn normalize(host: &str, path: &str) -> RoomId {
	let host = normalize_host(host);
	let path = normalize_path(path);
	RoomId::new(utf8_percent_encode(&format!("{host}-{path}"), FRAGMENT).to_string())
}

fn normalize_host(host: &str) -> String {
	let host = host.trim().to_ascii_lowercase();
	host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn normalize_path(path: &str) -> String {
	let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();

	let without_extension = strip_trailing_extension(&decoded);

	let trimmed = if without_extension == "/" {
		without_extension
	} else {
		without_extension.trim_end_matches('/').to_string()
	};

	if trimmed.is_empty() {
		"/".to_string()
	} else {
		trimmed
	}
}

/// Strips one trailing `.xxx`-shaped suffix, unless doing so would leave the
/// path empty (e.g. `/.env` keeps its extension; `/index.html` does not).
fn strip_trailing_extension(path: &str) -> String {
	let Some(last_segment_start) = path.rfind('/') else {
		return path.to_string();
	};
	let last_segment = &path[last_segment_start + 1..];
	let Some(dot) = last_segment.rfind('.') else {
		return path.to_string();
	};
	if dot == 0 {
		// leading-dot "file": not an extension, e.g. `.well-known`.
		return path.to_string();
	}
	let stem = &last_segment[..dot];
	if stem.is_empty() {
		return path.to_string();
	}
	format!("{}{}", &path[..last_segment_start + 1], stem)
}

/// A room ID derived from garbage input: empty host, filesystem-looking
/// paths, or a literal `"undefined"` round tripping through the client.
pub fn is_invalid_room_id(host: &str, path: &str) -> bool {
	let host = host.trim();
	if host.is_empty() || host.contains('/') || host.contains('\\') {
		return true;
	}
	let decoded = percent_decode_str(path).decode_utf8_lossy();
	let decoded = decoded.trim();
	if decoded.eq_ignore_ascii_case("undefined") || decoded.eq_ignore_ascii_case("null") {
		return true;
	}
	if decoded.contains("..") {
		return true;
	}
	false
}

/// Validates a room ID taken directly off the sync endpoint's `{roomId}`
/// path segment (SPEC_FULL.md §6): unlike [`normalize`]/[`is_invalid_room_id`],
/// which derive a canonical ID from a `(host, path)` pair for *referenced*
/// rooms (see the bridge's `sharedReferences` handling), the connecting
/// room's own ID arrives already canonical — the embedding page's client
/// library computed it with the same `host + "-" + path` rule before
/// opening the socket. This only flags the garbage cases §4.1 calls out.
pub fn is_invalid_plain_id(id: &str) -> bool {
	if id.is_empty() {
		return true;
	}
	let decoded = percent_decode_str(id).decode_utf8_lossy();
	let decoded = decoded.trim();
	decoded.eq_ignore_ascii_case("undefined") || decoded.eq_ignore_ascii_case("null") || decoded.contains("..")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	#[test]
	fn strips_www_and_trailing_extension() {
		let id = normalize("www.Example.com", "/rooms/lobby.html");
		assert_eq!(id.as_str(), "example.com-%2Frooms%2Flobby");
	}

	#[test]
	fn collapses_root_path() {
		let id = normalize("example.com", "");
		assert_eq!(id.as_str(), "example.com-%2F");
	}

	#[test]
	fn strips_trailing_slash() {
		let a = normalize("example.com", "/rooms/lobby/");
		let b = normalize("example.com", "/rooms/lobby");
		assert_eq!(a, b);
	}

	#[test]
	fn is_idempotent() {
		// `index.html` gives the first pass an extension and a host prefix to
		// strip; decomposing the canonical output and feeding it back through
		// `normalize` must be a no-op, since nothing is left to strip.
		let host = "WWW.Example.com";
		let path = "/Rooms/Lobby/index.html";
		let once = normalize(host, path);

		let decoded = percent_decode_str(once.as_str()).decode_utf8_lossy().into_owned();
		let (host_again, path_again) = decoded.split_once('-').unwrap();
		let twice = normalize(host_again, path_again);

		assert_eq!(once, twice);
	}

	#[test]
	fn flags_garbage_input() {
		assert!(is_invalid_room_id("", "/x"));
		assert!(is_invalid_room_id("example.com", "/undefined"));
		assert!(is_invalid_room_id("example.com", "/../etc/passwd"));
		assert!(!is_invalid_room_id("example.com", "/rooms/lobby"));
	}

	#[test]
	fn canonical_id_never_contains_a_literal_slash() {
		let id = normalize("example.com", "/rooms/lobby");
		assert!(!id.as_str().contains('/'), "room IDs must stay a single path segment: {id}");
	}

	#[test]
	fn plain_id_validator_flags_garbage_and_allows_canonical() {
		let canonical = normalize("example.com", "/rooms/lobby");
		assert!(!is_invalid_plain_id(canonical.as_str()));
		assert!(is_invalid_plain_id(""));
		assert!(is_invalid_plain_id("undefined"));
		assert!(is_invalid_plain_id("foo/../bar"));
	}
}
