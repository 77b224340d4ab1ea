use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical room identifier, already normalized by the room ID normalizer.
/// Carrying this as a distinct newtype (rather than a bare `String`) keeps
/// call sites from accidentally passing an un-normalized host/path pair
/// where a canonical ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub Box<str>);

impl RoomId {
	pub fn new(id: impl Into<Box<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RoomId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for RoomId {
	fn from(s: String) -> Self {
		Self(s.into_boxed_str())
	}
}

impl From<&str> for RoomId {
	fn from(s: &str) -> Self {
		Self(s.into())
	}
}

impl AsRef<str> for RoomId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
