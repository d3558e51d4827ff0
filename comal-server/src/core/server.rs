//! HTTP server assembly and lifecycle
//!
//! Builds the axum router with the full middleware stack and runs it on
//! axum-server with graceful shutdown.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::audit::AuditAction;
use crate::auth::{CurrentUser, require_auth};
use crate::core::{Config, ServerState};
use crate::utils::AppError;

/// Request ID generator for the `x-request-id` header
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Access log middleware
///
/// One line per request on the `http_access` target: request id, method,
/// matched path, authenticated user (when present), status and latency.
async fn log_request(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let user = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| format!("{}({})", u.username, u.id));

    let response = next.run(req).await;

    tracing::info!(
        target: "http_access",
        request_id = %request_id,
        user = user.as_deref().unwrap_or("-"),
        latency_ms = start.elapsed().as_millis() as u64,
        "{} {} {}",
        method,
        path,
        response.status()
    );

    response
}

/// All routes, no middleware and no state
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(crate::api::auth::router())
        .merge(crate::api::health::router())
        .merge(crate::api::users::router())
        .merge(crate::api::mesas::router())
        .merge(crate::api::products::router())
        .merge(crate::api::inventory::router())
        .merge(crate::api::orders::router())
        .merge(crate::api::statistics::router())
        .merge(crate::api::audit::router())
}

/// Routes plus the full middleware stack
///
/// Also used by tests to drive the app without a socket.
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        // Access log sits outside auth so failures are logged too
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        // require_auth skips the public routes internally
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// HTTP server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Reuse an already initialized state (tests, embedding)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        if let Err(e) = state
            .audit()
            .log_sync(
                AuditAction::SystemStartup,
                "system",
                "server:main",
                Some(serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "port": self.config.port,
                })),
            )
            .await
        {
            tracing::error!("Failed to record startup audit entry: {:?}", e);
        }

        let app = build_app(&state).with_state(state.clone());

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| AppError::internal(format!("Invalid bind address: {e}")))?;
        tracing::info!("Comal server listening on {}", addr);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let shutdown_timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(shutdown_timeout));
        });

        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

        if let Err(e) = state
            .audit()
            .log_sync(AuditAction::SystemShutdown, "system", "server:main", None)
            .await
        {
            tracing::error!("Failed to record shutdown audit entry: {:?}", e);
        }
        tracing::info!("Server stopped");

        Ok(())
    }
}
