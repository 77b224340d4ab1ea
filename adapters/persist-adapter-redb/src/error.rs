//! Adapter-local error type, converted into the crate-wide
//! `playhtml_types::Error` at the trait boundary (same split the reference
//! platform's own redb adapter uses for its storage-layer errors).

use std::fmt;

#[derive(Debug)]
pub enum Error {
	Database(String),
	Table(String),
	Transaction(String),
	Storage(String),
	Commit(String),
	Serialization(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Database(msg) => write!(f, "database error: {msg}"),
			Error::Table(msg) => write!(f, "table error: {msg}"),
			Error::Transaction(msg) => write!(f, "transaction error: {msg}"),
			Error::Storage(msg) => write!(f, "storage error: {msg}"),
			Error::Commit(msg) => write!(f, "commit error: {msg}"),
			Error::Serialization(msg) => write!(f, "serialization error: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<Error> for playhtml_types::Error {
	fn from(err: Error) -> Self {
		playhtml_types::Error::DbError(err.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}
