//! HTTP ingress: axum router, ambient middleware, and server lifecycle.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use auth::{StaticTokenValidator, TokenError, TokenValidator};
pub use config::{AmbientConfig, NetworkConfig};
pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::build_http_layers;
pub use module::{build_router, NetworkModule};
