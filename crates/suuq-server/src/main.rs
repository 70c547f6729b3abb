mod config;
mod expiry;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use suuq_api::storage::Storage;
use suuq_api::{AppState, AppStateInner};
use suuq_db::Database;
use suuq_gateway::{Dispatcher, connection};

use crate::config::Config;

#[derive(Clone)]
struct GatewayState {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "suuq=debug,suuq_api=debug,suuq_gateway=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let storage = Storage::new(config.storage_dir.clone()).await?;
    let dispatcher = Dispatcher::new();

    if !config.admin_emails.is_empty() {
        info!("{} admin e-mail(s) configured", config.admin_emails.len());
    }

    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        dispatcher: dispatcher.clone(),
        jwt_secret: config.jwt_secret.clone(),
        pricing: config.pricing.clone(),
        storage,
        public_url: config.public_url.clone(),
        admin_emails: config.admin_emails.clone(),
    });

    let gateway_state = GatewayState {
        db: db.clone(),
        dispatcher,
        jwt_secret: config.jwt_secret.clone(),
    };

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway_state);

    let app = suuq_api::router(app_state)
        .merge(ws_route)
        .nest_service("/storage", ServeDir::new(&config.storage_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tokio::spawn(expiry::run_expiry_loop(db, config.expiry_sweep_secs));

    info!("Suuq server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
