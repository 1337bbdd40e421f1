//! Typed HTTP errors.

use ambit_core::NotResolved;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::actor::ActorError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A context kind required by the route did not resolve.
    #[error(transparent)]
    NotResolved(#[from] NotResolved),
    /// The tenant actor could not be reached.
    #[error("tenant lookup failed: {0}")]
    TenantLookup(#[source] ActorError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotResolved(NotResolved { kind: "identity" }) => StatusCode::UNAUTHORIZED,
            ApiError::NotResolved(_) => StatusCode::BAD_REQUEST,
            ApiError::TenantLookup(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotResolved(_) => "not_resolved",
            ApiError::TenantLookup(_) => "tenant_lookup_failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(NotResolved { kind: "identity" }).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(NotResolved { kind: "tenant" }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TenantLookup(ActorError::NoSilo {
                target: "tenant/t1".to_string()
            })
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
