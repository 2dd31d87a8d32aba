//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy and health handlers
//! - Wire up middleware (tracing, request ID, concurrency limit, nosniff)
//! - Bind server to listener and drain on shutdown
//! - Log and count every proxy outcome

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header::X_CONTENT_TYPE_OPTIONS, HeaderMap, HeaderValue, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::request::{proxy_request_from_query, request_id, MakeRequestUuid};
use crate::http::response::image_response;
use crate::observability::metrics;
use crate::proxy::ImageProxy;
use crate::upstream::{ErrorKind, ProxyError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ImageProxy>,
}

/// HTTP server for the image proxy.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a server with production wiring (system DNS).
    pub fn new(config: ServiceConfig) -> Result<Self, reqwest::Error> {
        let proxy = ImageProxy::new(config.proxy.clone())?;
        Ok(Self::with_proxy(config, proxy))
    }

    /// Create a server around an already-built pipeline.
    pub fn with_proxy(config: ServiceConfig, proxy: ImageProxy) -> Self {
        let state = AppState {
            proxy: Arc::new(proxy),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.proxy.endpoint_path, get(image_proxy_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.config.proxy.endpoint_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Signed image proxy handler.
async fn image_proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();

    let result = match proxy_request_from_query(uri.query()) {
        Ok(request) => state.proxy.serve(request).await,
        Err(e) => Err(e),
    };
    let result = result.and_then(|image| {
        let content_type = image.content_type.clone();
        image_response(image, state.proxy.config().cache_max_age_secs)
            .map(|response| (content_type, response))
    });

    match result {
        Ok((content_type, response)) => {
            tracing::info!(
                request_id = %request_id,
                content_type = %content_type,
                "Relaying image"
            );
            metrics::record_request("ok", 200, start_time);
            response
        }
        Err(err) => {
            log_failure(&request_id, &err);
            metrics::record_request(err.kind().as_str(), err.status().as_u16(), start_time);
            err.into_response()
        }
    }
}

fn log_failure(request_id: &str, err: &ProxyError) {
    let kind = err.kind().as_str();
    match err.kind() {
        ErrorKind::PolicyRejected | ErrorKind::ResolutionFailure | ErrorKind::AuthorizationFailure => {
            tracing::warn!(request_id = %request_id, kind, error = %err, "Image request refused");
        }
        ErrorKind::TransportFailure => {
            tracing::error!(request_id = %request_id, kind, error = %err, "Upstream fetch failed");
        }
        _ => {
            tracing::info!(request_id = %request_id, kind, error = %err, "Image request rejected");
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
