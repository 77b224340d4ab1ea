//! Binary entry point: wires [`app::AppState`] together and serves the
//! sync websocket, bridge RPC and admin routes on one `axum::Router`.

mod admin;
mod app;
mod bridge;
mod routes;
mod ws;

use playhtml_types::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.init();

	let config = Config::from_env();
	let listen_addr = config.listen_addr.clone();

	let state = app::AppState::new(config).unwrap_or_else(|err| {
		tracing::error!(%err, "failed to initialize application state");
		std::process::exit(1);
	});

	let router = routes::build(state);

	let listener = tokio::net::TcpListener::bind(listen_addr.as_ref()).await?;
	tracing::info!(addr = %listen_addr, "listening");

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = tokio::signal::ctrl_c().await;
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(err) => {
				tracing::warn!(%err, "failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {}
		() = terminate => {}
	}
	tracing::info!("shutdown signal received");
}
