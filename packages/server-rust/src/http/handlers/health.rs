use axum::http::StatusCode;

/// Liveness probe. Always 200; does not touch ambient context or actors.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
