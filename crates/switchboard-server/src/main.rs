//! Process entrypoint: builds [`AppCore`] once, then serves the visitor/
//! agent WebSocket route plus a liveness probe behind CORS and request
//! tracing, hosting the routing engine directly in-process.

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use switchboard_core::{ws_handler, AppCore, Config};

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
    llm_configured: bool,
}

async fn health(axum::extract::State(core): axum::extract::State<Arc<AppCore>>) -> Json<Health> {
    Json(Health { status: "switchboard is routing", llm_configured: core.llm.is_some() })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,switchboard_core=debug,switchboard_server=debug".into()),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    tracing::info!("starting switchboard chat-routing server");

    let config = Config::load()?;
    let (host, port) = (config.host.clone(), config.port);
    let core = Arc::new(AppCore::build(config)?);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(core);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| anyhow::anyhow!("failed to bind to {addr}: {err}"))?;

    tracing::info!("switchboard listening on ws://{addr}/ws");

    axum::serve(listener, app).await.map_err(|err| anyhow::anyhow!("server error: {err}"))?;

    Ok(())
}
