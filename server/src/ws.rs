//! Sync WebSocket handler (SPEC_FULL.md §4.4): upgrades a client connection,
//! attaches it to the room actor's mailbox, and multiplexes the binary CRDT
//! sync protocol with JSON bridge-control text frames on the same socket
//! (§4.4.1's single-socket framing convention).

use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use playhtml_room::{
	ConnMessage, ConnectionId, Permission, RoomHandle, MSG_OUTER_AWARENESS, MSG_OUTER_SYNC, MSG_SYNC_STEP1, MSG_SYNC_STEP2,
	MSG_SYNC_UPDATE,
};
use playhtml_types::{RoomId, Timestamp};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::app::App;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
	shared_references: Option<String>,
	shared_elements: Option<String>,
	client_reset_epoch: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedReferenceQuery {
	domain: String,
	path: String,
	element_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedElementQuery {
	element_id: String,
	permissions: Permission,
}

/// Client control frames carried as WebSocket Text alongside the Binary sync
/// protocol (SPEC_FULL.md §4.5.5, §6).
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientControlMessage {
	#[serde(rename = "add-shared-reference")]
	AddSharedReference { reference: SharedReferenceQuery },
	#[serde(rename = "register-shared-element")]
	RegisterSharedElement { element: SharedElementQuery },
	#[serde(rename = "export-permissions")]
	ExportPermissions {
		#[serde(rename = "elementIds")]
		element_ids: Vec<String>,
	},
}

pub async fn upgrade(
	State(state): State<App>,
	Path(room_id_raw): Path<String>,
	Query(query): Query<SyncQuery>,
	ws: WebSocketUpgrade,
) -> Response {
	let room_id = match state.resolve_existing_room_id(&room_id_raw).await {
		Ok(id) => id,
		Err(err) => return err.into_response(),
	};

	let handle = state.registry.get_or_create(&room_id).await;

	if let Err(err) = prepare_connection(&state, &handle, &room_id, &query).await {
		return err.into_response();
	}

	let stored_epoch = match handle.current_reset_epoch().await {
		Ok(epoch) => epoch,
		Err(err) => return err.into_response(),
	};
	let needs_reset_notice = query.client_reset_epoch.is_some_and(|client_epoch| client_epoch < stored_epoch);

	ws.on_upgrade(move |socket| run_connection(socket, state, handle, room_id, stored_epoch, needs_reset_notice))
}

/// Steps 3-5 of SPEC_FULL.md §4.4, run before the socket is even upgraded:
/// arm the alarm implicitly (via the room's own command handlers), merge in
/// declared `sharedReferences`/`sharedElements`, and dispatch `subscribe` RPCs
/// for any newly-added reference.
async fn prepare_connection(
	state: &App,
	handle: &RoomHandle,
	room_id: &RoomId,
	query: &SyncQuery,
) -> playhtml_types::ClResult<()> {
	if let Some(raw) = &query.shared_references {
		let refs: Vec<SharedReferenceQuery> = serde_json::from_str(raw)
			.map_err(|err| playhtml_types::Error::ValidationError(format!("invalid sharedReferences: {err}")))?;
		if !refs.is_empty() {
			let mut grouped: HashMap<RoomId, Vec<String>> = HashMap::new();
			for reference in refs {
				let source_room_id = state.resolve_room_id(&reference.domain, &reference.path).await?;
				grouped.entry(source_room_id).or_default().push(reference.element_id);
			}
			dispatch_new_subscriptions(state, handle, room_id, grouped).await?;
		}
	}

	if let Some(raw) = &query.shared_elements {
		let elements: Vec<SharedElementQuery> = serde_json::from_str(raw)
			.map_err(|err| playhtml_types::Error::ValidationError(format!("invalid sharedElements: {err}")))?;
		if !elements.is_empty() {
			let pairs = elements.into_iter().map(|e| (e.element_id, e.permissions)).collect();
			handle.set_shared_elements(pairs).await?;
		}
	}

	Ok(())
}

async fn dispatch_new_subscriptions(
	state: &App,
	handle: &RoomHandle,
	room_id: &RoomId,
	grouped: HashMap<RoomId, Vec<String>>,
) -> playhtml_types::ClResult<()> {
	let lease_ms = (state.config.subscriber_lease_secs as i64) * 1000;
	let entries: Vec<(RoomId, Vec<String>)> = grouped.into_iter().collect();
	let newly_added = handle.add_shared_references(entries, lease_ms).await?;
	for (source_room_id, element_ids) in newly_added {
		let registry = state.registry.clone();
		let consumer_room_id = room_id.clone();
		tokio::spawn(async move {
			let source_handle = registry.get_or_create(&source_room_id).await;
			if let Err(err) = source_handle.subscribe(consumer_room_id, element_ids, lease_ms).await {
				tracing::warn!(room_id = %source_room_id, %err, "subscribe rpc failed");
			}
		});
	}
	Ok(())
}

async fn run_connection(socket: WebSocket, state: App, handle: RoomHandle, room_id: RoomId, stored_epoch: i64, needs_reset_notice: bool) {
	let (mut sink, mut stream) = socket.split();
	let (tx, mut rx) = mpsc::unbounded_channel::<ConnMessage>();

	let conn_id = match handle.register_connection(tx.clone()).await {
		Ok(id) => id,
		Err(err) => {
			tracing::warn!(%err, "failed to register sync connection");
			return;
		}
	};

	// Queue the initial handshake frames onto the same mailbox the actor
	// pushes broadcasts through, so relative ordering is preserved.
	match handle.state_vector().await {
		Ok(state_vector) => {
			let mut framed = Vec::with_capacity(state_vector.len() + 2);
			framed.push(MSG_OUTER_SYNC);
			framed.push(MSG_SYNC_STEP1);
			framed.extend_from_slice(&state_vector);
			let _ = tx.send(ConnMessage::Binary(framed));
		}
		Err(err) => tracing::warn!(%err, "failed to read initial state vector"),
	}

	if needs_reset_notice {
		let payload = serde_json::json!({
			"type": "room-reset",
			"timestamp": Timestamp::now().millis(),
			"resetEpoch": stored_epoch,
		});
		let _ = tx.send(ConnMessage::Text(payload.to_string()));
	}

	let forward_task = tokio::spawn(async move {
		while let Some(msg) = rx.recv().await {
			let outcome = match msg {
				ConnMessage::Binary(bytes) => sink.send(Message::Binary(bytes.into())).await,
				ConnMessage::Text(text) => sink.send(Message::Text(text.into())).await,
				ConnMessage::Close { code, reason } => {
					let _ = sink.send(Message::Close(Some(CloseFrame { code, reason: Cow::Owned(reason) }))).await;
					break;
				}
			};
			if outcome.is_err() {
				break;
			}
		}
	});

	while let Some(Ok(message)) = stream.next().await {
		match message {
			Message::Binary(bytes) => handle_binary(&handle, &tx, conn_id, &bytes).await,
			Message::Text(text) => handle_text(&state, &handle, &room_id, &tx, conn_id, &text).await,
			Message::Close(_) => break,
			Message::Ping(_) | Message::Pong(_) => {}
		}
	}

	handle.unregister_connection(conn_id);
	forward_task.abort();
}

async fn handle_binary(handle: &RoomHandle, tx: &mpsc::UnboundedSender<ConnMessage>, conn_id: ConnectionId, bytes: &[u8]) {
	if bytes.len() < 2 {
		return;
	}
	let outer = bytes[0];
	let inner = bytes[1];
	let payload = bytes[2..].to_vec();

	match outer {
		MSG_OUTER_SYNC => match inner {
			MSG_SYNC_STEP1 => match handle.sync_step1(payload).await {
				Ok(Ok(diff)) => {
					let mut framed = Vec::with_capacity(diff.len() + 2);
					framed.push(MSG_OUTER_SYNC);
					framed.push(MSG_SYNC_STEP2);
					framed.extend_from_slice(&diff);
					let _ = tx.send(ConnMessage::Binary(framed));
				}
				Ok(Err(err)) => tracing::warn!(%err, "client sent an invalid state vector"),
				Err(err) => tracing::warn!(%err, "sync-step1 rpc failed"),
			},
			MSG_SYNC_STEP2 | MSG_SYNC_UPDATE => match handle.client_update(payload).await {
				Ok(Ok(())) => {}
				Ok(Err(err)) => tracing::warn!(%err, "client sent an invalid crdt update"),
				Err(err) => tracing::warn!(%err, "client-update rpc failed"),
			},
			_ => tracing::debug!(inner, "unknown inner sync message type"),
		},
		MSG_OUTER_AWARENESS => {
			// Opaque, never interpreted or persisted (SPEC_FULL.md §4.4.1):
			// forwarded verbatim to every other connection in the room.
			handle.broadcast_raw(conn_id, ConnMessage::Binary(bytes.to_vec()));
		}
		_ => tracing::debug!(outer, "unknown outer message type"),
	}
}

async fn handle_text(state: &App, handle: &RoomHandle, room_id: &RoomId, tx: &mpsc::UnboundedSender<ConnMessage>, conn_id: ConnectionId, text: &str) {
	match serde_json::from_str::<ClientControlMessage>(text) {
		Ok(ClientControlMessage::AddSharedReference { reference }) => {
			match state.resolve_room_id(&reference.domain, &reference.path).await {
				Ok(source_room_id) => {
					let mut grouped = HashMap::new();
					grouped.insert(source_room_id, vec![reference.element_id]);
					if let Err(err) = dispatch_new_subscriptions(state, handle, room_id, grouped).await {
						tracing::warn!(%err, "add-shared-reference failed");
					}
				}
				Err(err) => tracing::warn!(%err, "failed to resolve add-shared-reference target"),
			}
		}
		Ok(ClientControlMessage::RegisterSharedElement { element }) => {
			if let Err(err) = handle.register_shared_element(element.element_id, element.permissions).await {
				tracing::warn!(%err, "register-shared-element failed");
			}
		}
		Ok(ClientControlMessage::ExportPermissions { element_ids }) => match handle.export_permissions(element_ids).await {
			Ok(permissions) => {
				let payload = serde_json::json!({ "permissions": permissions });
				let _ = tx.send(ConnMessage::Text(payload.to_string()));
			}
			Err(err) => tracing::warn!(%err, "export-permissions rpc failed"),
		},
		// Not a recognized control frame: relay verbatim to the room's other
		// connections (SPEC_FULL.md §4.4, "Non-JSON text messages ... are
		// broadcast verbatim"; the same passthrough applies to JSON the
		// bridge doesn't claim as a control type).
		Err(_) => handle.broadcast_raw(conn_id, ConnMessage::Text(text.to_string())),
	}
}
