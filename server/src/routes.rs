//! Assembles the one `axum::Router<App>` the binary serves, mirroring the
//! reference platform's `routes::init` — independently readable route
//! groups merged at the end, with the admin sub-router token-gated by a
//! single `middleware::from_fn_with_state` layer (SPEC_FULL.md §4.7.1).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::{admin, bridge, ws};

pub fn build(state: App) -> Router {
	let admin_router = Router::new()
		.route("/inspect", get(admin::inspect))
		.route("/raw-data", get(admin::raw_data))
		.route("/live-compare", get(admin::live_compare))
		.route("/remove-subscriber", post(admin::remove_subscriber))
		.route("/force-save-live", post(admin::force_save_live))
		.route("/force-reload-live", post(admin::force_reload_live))
		.route("/hard-reset", post(admin::hard_reset))
		.route("/restore-raw", post(admin::restore_raw))
		.layer(middleware::from_fn_with_state(state.clone(), admin::require_token));

	let room_router = Router::new()
		.route("/room/{room_id}", get(ws::upgrade).post(bridge::handle))
		.nest("/room/{room_id}/admin", admin_router);

	Router::new()
		.route("/healthz", get(healthz))
		.merge(room_router)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::very_permissive())
		.with_state(state)
}

async fn healthz(State(state): State<App>) -> impl IntoResponse {
	let room_count = state.registry.room_count().await;
	Json(serde_json::json!({"status": "ok", "rooms": room_count}))
}
