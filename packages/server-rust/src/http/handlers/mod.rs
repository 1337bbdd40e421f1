//! HTTP handler definitions.
//!
//! Defines `AppState` (the shared state carried through axum extractors) and
//! re-exports the handler functions used when building the router.

pub mod context;
pub mod health;

pub use context::{correlation_handler, me_handler, tenant_handler};
pub use health::liveness_handler;

use std::sync::Arc;

use super::auth::TokenValidator;
use super::config::NetworkConfig;
use crate::directory::TenantDirectory;
use crate::enrichment::ClaimsEnricher;
use crate::resolver::ContextResolvers;

/// Shared application state passed to handlers and middleware via `State`.
///
/// Holds `Arc` references so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub resolvers: ContextResolvers,
    /// Tenant actor used by tenant enforcement.
    pub tenants: Arc<dyn TenantDirectory>,
    pub enricher: Arc<ClaimsEnricher>,
    pub tokens: Arc<dyn TokenValidator>,
    pub config: Arc<NetworkConfig>,
}
