//! HTTP request handlers.

use super::types::{CollectionResponse, DeviceItem, HealthResponse};
use super::AppState;
use crate::error::RegistryError;
use crate::rpc::{self, Operation, RpcOutcome};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, RegistryError> {
    let record_count = state.directory.record_count().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        record_count,
        operations: Operation::ALL.iter().map(Operation::name).collect(),
    }))
}

/// Invoke a named operation with a JSON parameter body.
///
/// An empty body is treated as `null` parameters.
pub async fn invoke(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Response, RegistryError> {
    let operation: Operation = operation.parse().map_err(|e| {
        warn!(operation = %operation, "Unknown operation requested");
        e
    })?;

    let params = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    let outcome = rpc::dispatch(&state.directory, operation, params).await?;

    Ok(match outcome {
        RpcOutcome::Empty => StatusCode::NO_CONTENT.into_response(),
        RpcOutcome::Items(items) => {
            info!(%operation, returned = items.len(), "Returning collection");
            let items = items.into_iter().map(DeviceItem::from).collect();
            Json(CollectionResponse { items }).into_response()
        }
    })
}
