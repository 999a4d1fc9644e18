//! HTTP ingress of the hub
//!
//! ## Endpoints
//!
//! - `GET  /api/v1/health` - Hub liveness (never requires a token)
//! - `POST /api/v1/heartbeat` - Record a heartbeat `{name, extra?}`
//! - `GET  /api/v1/heartbeats` - State of every watched entity
//! - `POST /api/v1/pairs` - Register pairs of interest
//! - `GET  /api/v1/symbols` - Registered symbols per exchange
//!
//! Bad input is answered with `400` and `{"error": "..."}`.

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{ApiResponse, HealthResponse, HeartbeatRequest, SymbolsData};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::{Ipv4Addr, SocketAddr};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,

    /// Bearer token required on every endpoint except health
    pub auth_token: Option<String>,

    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, crate::util::get_default_port())),
            auth_token: None,
            enable_cors: true,
        }
    }
}

/// Router with every endpoint, without CORS or auth layers
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/heartbeat", post(routes::heartbeat::record_heartbeat))
        .route("/api/v1/heartbeats", get(routes::heartbeat::list_heartbeats))
        .route("/api/v1/pairs", post(routes::pairs::register_pairs))
        .route("/api/v1/symbols", get(routes::pairs::list_symbols))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// Binds the listener, serves in a background task and returns the bound
/// address (useful with port `0`).
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
