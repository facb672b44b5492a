use crate::api;
use crate::config::AppConfig;
use crate::session::KeyValueStore;
use crate::transport::Transport;
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn KeyValueStore>,
    /// Contents of the configured host page, read once at startup.
    pub host_html: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        host_html: Option<String>,
    ) -> Self {
        Self {
            config,
            transport,
            storage,
            host_html: host_html.map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/preview", get(api::preview))
        .route("/snippet", get(api::snippet))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down preview server");
}
