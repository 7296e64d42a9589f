//! HTTP route handlers.

pub mod invoke;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
