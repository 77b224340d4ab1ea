//! Transaction origin tags.
//!
//! The bridge uses these to distinguish "why" a transaction happened so its
//! update observers can tell a locally-applied mirror from a genuinely new
//! edit and avoid mirroring it straight back (see `Bridge` observer loops).
//! This is the authoritative echo-suppression mechanism; no boolean
//! suppress-next flag exists anywhere in this crate.

/// Origin stamped on a transaction that applies a source room's update into
/// a consumer room (source -> consumer).
pub const ORIGIN_S2C: &[u8] = b"playhtml:s2c";

/// Origin stamped on a transaction that applies a consumer room's update
/// into a source room (consumer -> source).
pub const ORIGIN_C2S: &[u8] = b"playhtml:c2s";

/// Classifies the origin recorded on a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
	/// No origin, or one this crate didn't stamp — a genuine local edit
	/// coming off the client sync protocol.
	Local,
	SourceToConsumer,
	ConsumerToSource,
}

pub fn classify(origin: Option<&[u8]>) -> OriginKind {
	match origin {
		Some(ORIGIN_S2C) => OriginKind::SourceToConsumer,
		Some(ORIGIN_C2S) => OriginKind::ConsumerToSource,
		_ => OriginKind::Local,
	}
}
