use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, serialized as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Self {
		#[allow(clippy::cast_possible_wrap)]
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as i64)
			.unwrap_or(0);
		Self(millis)
	}

	/// A timestamp `delta_ms` milliseconds from now (negative for the past).
	pub fn from_now(delta_ms: i64) -> Self {
		Self(Self::now().0 + delta_ms)
	}

	pub fn millis(self) -> i64 {
		self.0
	}

	pub fn elapsed_ms_since(self, other: Timestamp) -> i64 {
		self.0 - other.0
	}
}

impl Serialize for Timestamp {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_i64(self.0)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let millis = i64::deserialize(deserializer)?;
		Ok(Self(millis))
	}
}
