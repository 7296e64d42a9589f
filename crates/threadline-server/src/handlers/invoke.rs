//! Session router: validates one message and forwards it to the agent.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use threadline_core::FinalState;
use tracing::{debug, error, info, warn};

use crate::dto::InvokeRequest;
use crate::error::ApiError;
use crate::ServerState;

/// `POST /invoke` — returns the agent's final state unmodified.
pub async fn invoke(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FinalState>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        warn!("Rejected request body: {}", e);
        ApiError::InvalidJson
    })?;

    let req = InvokeRequest::from_json(&body).map_err(|e| {
        warn!("Invalid invoke request: {:?}", e);
        e
    })?;

    info!(thread_id = %req.thread_id, "Invoke request: {}...", req.preview());

    match state.agent.invoke(&req.message, &req.thread_id).await {
        Ok(final_state) => {
            debug!(thread_id = %req.thread_id, "Request processed: {}", final_state.as_value());
            Ok(Json(final_state))
        }
        Err(e) => {
            error!(thread_id = %req.thread_id, "Agent invocation failed: {}", e);
            Err(ApiError::Upstream)
        }
    }
}
