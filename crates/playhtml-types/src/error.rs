//! Error handling subsystem. Implements a custom Error type mapped to HTTP
//! responses the same way across the sync endpoint, the bridge RPC surface
//! and the admin control plane.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	Unauthorized, // 401 - missing/invalid admin token
	ValidationError(String), // 400 - malformed request body/query
	Conflict(String),        // 409 - constraint violation (redirect cycle, etc)
	DbError(String),
	NetworkError(String), // inter-room RPC failures
	Timeout,
	Internal(String),
	Io(std::io::Error),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{:?}", self)
	}
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub code: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { error: ErrorBody { code: code.into(), message: message.into() } }
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let (status, code, message) = match self {
			Error::NotFound => {
				(StatusCode::NOT_FOUND, "E-ROOM-NOTFOUND", "Room or resource not found".to_string())
			}
			Error::Unauthorized => (
				StatusCode::UNAUTHORIZED,
				"E-AUTH-UNAUTH",
				"Admin token missing or invalid".to_string(),
			),
			Error::ValidationError(msg) => {
				(StatusCode::BAD_REQUEST, "E-VAL-INVALID", format!("Request validation failed: {msg}"))
			}
			Error::Conflict(msg) => {
				(StatusCode::CONFLICT, "E-ROOM-CONFLICT", format!("Resource conflict: {msg}"))
			}
			Error::Timeout => (StatusCode::REQUEST_TIMEOUT, "E-NET-TIMEOUT", "Request timeout".to_string()),
			Error::DbError(msg) => {
				tracing::warn!(%msg, "persistence error");
				(StatusCode::INTERNAL_SERVER_ERROR, "E-CORE-DBERR", "Internal server error".to_string())
			}
			Error::NetworkError(msg) => {
				tracing::warn!(%msg, "inter-room rpc error");
				(StatusCode::INTERNAL_SERVER_ERROR, "E-NET-ERROR", "Internal server error".to_string())
			}
			Error::Internal(msg) => {
				tracing::warn!(%msg, "internal error");
				(StatusCode::INTERNAL_SERVER_ERROR, "E-CORE-INTERNAL", "Internal server error".to_string())
			}
			Error::Io(err) => {
				tracing::warn!(%err, "io error");
				(StatusCode::INTERNAL_SERVER_ERROR, "E-SYS-IO", "Internal server error".to_string())
			}
		};

		(status, Json(ErrorResponse::new(code, message))).into_response()
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::ValidationError(err.to_string())
	}
}

impl From<base64::DecodeError> for Error {
	fn from(err: base64::DecodeError) -> Self {
		Self::ValidationError(format!("invalid base64: {err}"))
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(err: tokio::task::JoinError) -> Self {
		Self::Internal(format!("task join error: {err}"))
	}
}

/// Locks a mutex, converting poisoning into `Error::Internal`.
#[macro_export]
macro_rules! lock {
	($mutex:expr) => {
		$mutex.lock().map_err(|_| $crate::Error::Internal("mutex poisoned".into()))
	};
	($mutex:expr, $context:expr) => {
		$mutex
			.lock()
			.map_err(|_| $crate::Error::Internal(format!("mutex poisoned: {}", $context)))
	};
}
