//! Admin control plane: `GET|POST /room/{roomId}/admin/*` (SPEC_FULL.md §4.7),
//! gated by [`require_token`] applied once to the whole sub-router
//! (§4.7.1) rather than re-checked in each handler below.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use playhtml_room::RoomHandle;
use playhtml_types::{ClResult, Error, RoomId};
use serde::{Deserialize, Serialize};

use crate::app::App;

pub async fn require_token(State(state): State<App>, req: Request<Body>, next: Next) -> Response {
	match check_token(&state, &req) {
		Ok(()) => next.run(req).await,
		Err(err) => err.into_response(),
	}
}

fn check_token(state: &App, req: &Request<Body>) -> ClResult<()> {
	let Some(expected) = state.config.admin_token.as_deref() else {
		return Ok(());
	};

	let from_header = req
		.headers()
		.get(header::AUTHORIZATION)
		.and_then(|h| h.to_str().ok())
		.and_then(|h| h.strip_prefix("Bearer "));
	if from_header == Some(expected) {
		return Ok(());
	}

	if token_from_query(req.uri().query().unwrap_or("")).as_deref() == Some(expected) {
		return Ok(());
	}

	Err(Error::Unauthorized)
}

fn token_from_query(query: &str) -> Option<String> {
	query.split('&').find_map(|pair| {
		let (key, value) = pair.split_once('=')?;
		(key == "token").then(|| percent_encoding::percent_decode_str(value).decode_utf8_lossy().into_owned())
	})
}

/// Resolved handle for a room an admin endpoint is operating on. Uses
/// [`playhtml_room::RoomRegistry::get`], not `get_or_create`: a room nobody
/// has connected to yet should 404 here rather than spring into existence.
async fn existing_room(state: &App, room_id_raw: &str) -> ClResult<RoomHandle> {
	let room_id = state.resolve_existing_room_id(room_id_raw).await?;
	state.registry.get(&room_id).await.ok_or(Error::NotFound)
}

fn finish<T: Serialize>(result: ClResult<T>) -> Response {
	match result {
		Ok(value) => Json(value).into_response(),
		Err(err) => err.into_response(),
	}
}

pub async fn inspect(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(run(&state, &room_id_raw, |handle| async move { handle.inspect().await? }).await)
}

pub async fn raw_data(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(run(&state, &room_id_raw, |handle| async move { handle.raw_data().await? }).await)
}

pub async fn live_compare(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(run(&state, &room_id_raw, |handle| async move { handle.live_compare().await? }).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSubscriberBody {
	consumer_room_id: RoomId,
}

pub async fn remove_subscriber(
	State(state): State<App>,
	Path(room_id_raw): Path<String>,
	Json(body): Json<RemoveSubscriberBody>,
) -> Response {
	finish(
		run(&state, &room_id_raw, |handle| async move {
			let removed = handle.remove_subscriber(body.consumer_room_id).await?;
			Ok(serde_json::json!({ "removed": removed }))
		})
		.await,
	)
}

pub async fn force_save_live(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(
		run(&state, &room_id_raw, |handle| async move {
			handle.force_save_live().await??;
			Ok(serde_json::json!({ "ok": true }))
		})
		.await,
	)
}

pub async fn force_reload_live(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(
		run(&state, &room_id_raw, |handle| async move {
			handle.force_reload_live().await??;
			Ok(serde_json::json!({ "ok": true }))
		})
		.await,
	)
}

pub async fn hard_reset(State(state): State<App>, Path(room_id_raw): Path<String>) -> Response {
	finish(run(&state, &room_id_raw, |handle| async move { handle.hard_reset().await? }).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRawBody {
	base64_snapshot: String,
	#[serde(default)]
	bump_epoch: bool,
}

pub async fn restore_raw(State(state): State<App>, Path(room_id_raw): Path<String>, Json(body): Json<RestoreRawBody>) -> Response {
	finish(
		run(&state, &room_id_raw, |handle| async move {
			handle.restore_raw(body.base64_snapshot, body.bump_epoch).await?
		})
		.await,
	)
}

/// Resolves `room_id_raw` to a live [`RoomHandle`] and runs `op` against it,
/// folding the registry lookup and the actor RPC into one `ClResult`.
async fn run<T, F, Fut>(state: &App, room_id_raw: &str, op: F) -> ClResult<T>
where
	F: FnOnce(RoomHandle) -> Fut,
	Fut: std::future::Future<Output = ClResult<T>>,
{
	let handle = existing_room(state, room_id_raw).await?;
	op(handle).await
}
