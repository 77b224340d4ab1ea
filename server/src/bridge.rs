//! Bridge HTTP handler: `POST /room/{roomId}` (SPEC_FULL.md §4.5.2, §6). The
//! request body is a discriminated-by-`type` JSON object; this module is the
//! only place that translates its camelCase wire shape into the snake_case
//! [`ApplySubtreesBody`] the in-process registry RPC already uses (see
//! DESIGN.md — that internal struct never round-trips through this crate's
//! own serde attributes, only through this handler's explicit field renames).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use playhtml_room::{ApplySubtreesBody, OriginKindWire, SubscribeResponse};
use playhtml_types::{ClResult, RoomId};
use serde::Deserialize;

use crate::app::App;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum BridgeRequest {
	Subscribe {
		#[serde(rename = "consumerRoomId")]
		consumer_room_id: RoomId,
		#[serde(rename = "elementIds")]
		element_ids: Vec<String>,
	},
	ExportPermissions {
		#[serde(rename = "elementIds")]
		element_ids: Vec<String>,
	},
	ApplySubtreesImmediate {
		subtrees: serde_json::Map<String, serde_json::Value>,
		sender: RoomId,
		#[serde(rename = "originKind")]
		origin_kind: OriginKindWire,
		#[serde(rename = "resetEpoch")]
		reset_epoch: i64,
	},
}

pub async fn handle(State(state): State<App>, Path(room_id_raw): Path<String>, Json(body): Json<BridgeRequest>) -> Response {
	match dispatch(&state, &room_id_raw, body).await {
		Ok(value) => Json(value).into_response(),
		Err(err) => err.into_response(),
	}
}

async fn dispatch(state: &App, room_id_raw: &str, body: BridgeRequest) -> ClResult<serde_json::Value> {
	let room_id = state.resolve_existing_room_id(room_id_raw).await?;
	let handle = state.registry.get_or_create(&room_id).await;

	match body {
		BridgeRequest::Subscribe { consumer_room_id, element_ids } => {
			let lease_ms = (state.config.subscriber_lease_secs as i64) * 1000;
			let subscribed_ids = handle.subscribe(consumer_room_id, element_ids, lease_ms).await?;
			let response = SubscribeResponse { ok: true, subscribed: true, element_ids: subscribed_ids };
			Ok(serde_json::to_value(response)?)
		}
		BridgeRequest::ExportPermissions { element_ids } => {
			let permissions: HashMap<String, _> = handle.export_permissions(element_ids).await?;
			Ok(serde_json::json!({ "permissions": permissions }))
		}
		BridgeRequest::ApplySubtreesImmediate { subtrees, sender, origin_kind, reset_epoch } => {
			let apply_body = ApplySubtreesBody { subtrees, sender, origin_kind, reset_epoch };
			handle.apply_subtrees_immediate(apply_body).await??;
			Ok(serde_json::json!({ "ok": true }))
		}
	}
}
