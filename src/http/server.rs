//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, upload body limit)
//! - Bind server to listener
//! - Swap in reloaded configuration
//! - Stop on the shutdown signal, draining in-flight requests

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::backend::{BackendClient, BackendError};
use crate::config::validation::validate_config;
use crate::config::{CorsConfig, GatewayConfig};
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::observability::spans::make_request_span;
use crate::relay;

/// Allowance above the file limit for boundaries, part headers and small fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Configuration snapshot and the backend client built from it.
pub struct Inner {
    pub config: GatewayConfig,
    pub backend: BackendClient,
}

impl Inner {
    fn build(config: GatewayConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(config.backend.clone(), &config.timeouts)?;
        Ok(Self { config, backend })
    }
}

/// Application state injected into handlers.
///
/// Handlers load the snapshot once per request; a reload swaps it atomically.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<Inner>>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, BackendError> {
        let inner = Inner::build(config)?;
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
        })
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Inner> {
        self.inner.load_full()
    }

    /// Replace the snapshot with one built from `config`.
    pub fn reload(&self, config: GatewayConfig) -> Result<(), BackendError> {
        let current = self.inner.load();
        if current.config.listener != config.listener
            || current.config.limits != config.limits
            || current.config.cors != config.cors
        {
            tracing::warn!("Listener, limits and CORS changes take effect after a restart");
        }

        let inner = Inner::build(config)?;
        tracing::info!(backend = %inner.backend.base_url(), "Configuration reloaded");
        self.inner.store(Arc::new(inner));
        Ok(())
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, BackendError> {
        let state = AppState::new(config.clone())?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        // The file itself is checked against `max_upload_bytes` while parsing;
        // the body limit leaves room for multipart framing and other fields.
        let upload_limit = DefaultBodyLimit::max(
            config
                .limits
                .max_upload_bytes
                .saturating_add(MULTIPART_OVERHEAD_BYTES),
        );

        let router = Router::new()
            .route("/api", get(info))
            .route("/api/", get(info))
            .route("/api/answer", post(relay::answer))
            .route("/api/reset", post(relay::reset))
            .route(
                "/api/document",
                post(relay::upload_document).layer(upload_limit),
            )
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            );

        match cors_layer(&config.cors) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// Router clone, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state handle.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates received on `config_updates` replace the handler
    /// snapshot. The server stops accepting when `shutdown` fires and returns
    /// once in-flight requests have drained.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(errors) = validate_config(&config) {
                    for e in &errors {
                        tracing::error!(error = %e, "Rejected reloaded config");
                    }
                    continue;
                }
                if let Err(e) = state.reload(config) {
                    tracing::error!(error = %e, "Failed to apply reloaded config, keeping current one");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let origin = if config.allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    )
}

/// GET /api/ - liveness greeting.
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "rag-gateway is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
