//! Handlers exposing the resolved ambient context of the request.

use ambit_core::{IdentityContext, TenantContext};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;
use crate::http::error::ApiError;

/// Correlation id seen by the request. `null` only if nothing resolved.
pub async fn correlation_handler(State(state): State<AppState>) -> Json<Value> {
    let correlation = state.resolvers.correlation.try_resolve();
    Json(json!({ "correlationId": correlation }))
}

/// The request's tenant.
///
/// # Errors
///
/// `ApiError::NotResolved` (400) if no tenant resolves.
pub async fn tenant_handler(
    State(state): State<AppState>,
) -> Result<Json<TenantContext>, ApiError> {
    Ok(Json(state.resolvers.tenant.resolve()?))
}

/// The caller's identity, after claims enrichment.
///
/// # Errors
///
/// `ApiError::NotResolved` (401) if the request is anonymous.
pub async fn me_handler(State(state): State<AppState>) -> Result<Json<IdentityContext>, ApiError> {
    Ok(Json(state.resolvers.identity.resolve()?))
}
