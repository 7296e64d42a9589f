//! HTTP front door for the threadline agent.
//!
//! Exposes `POST /invoke` (path configurable) and `GET /health`. The router
//! owns no state of its own beyond the shared [`AgentClient`].

pub mod dto;
pub mod error;
pub mod handlers;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Result};
use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use threadline_agent::AgentClient;
use threadline_config::{ApiSettings, CorsSettings};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ApiError;

const HEALTH_PATH: &str = "/health";

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub agent: AgentClient,
    pub api: ApiSettings,
}

impl ServerState {
    pub fn new(agent: AgentClient, api: ApiSettings) -> Self {
        Self { agent, api }
    }
}

/// Checks that the configured routes can be mounted.
pub fn validate_api_settings(api: &ApiSettings) -> Result<()> {
    ensure!(
        api.invoke_path.starts_with('/'),
        "api.invoke_path must start with '/', got '{}'",
        api.invoke_path
    );
    ensure!(
        api.invoke_path != HEALTH_PATH,
        "api.invoke_path cannot be {}",
        HEALTH_PATH
    );
    Ok(())
}

/// Builds the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route(&state.api.invoke_path, post(handlers::invoke::invoke))
        .layer(trace_layer);

    let mut app = Router::new()
        .merge(logged_routes)
        .route(HEALTH_PATH, get(handlers::health));

    if state.api.cors.enabled {
        app = app.layer(cors_layer(&state.api.cors));
    }

    app.layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(AnyOrigin).allow_headers(AnyOrigin);

    if settings.origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = settings
        .origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Last-resort sink for handler panics.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!("Handler panicked: {}", detail);
    ApiError::Upstream.into_response()
}
