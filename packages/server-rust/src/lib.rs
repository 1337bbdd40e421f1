//! Ambit server: ambient context resolution and propagation.
//!
//! - [`ambient`]: call-scoped channels for the HTTP and actor transports.
//! - [`provider`] / [`resolver`]: priority-ordered lookup of identity,
//!   tenant and correlation context.
//! - [`actor`] / [`interceptor`]: a small virtual-actor runtime whose call
//!   pipelines carry that context across silos.
//! - [`enrichment`] / [`telemetry`]: consumers of the resolved context.
//! - [`http`]: axum ingress writing the request's context.

pub mod actor;
pub mod ambient;
pub mod directory;
pub mod enrichment;
pub mod http;
pub mod interceptor;
pub mod provider;
pub mod resolver;
pub mod telemetry;

pub use resolver::{ContextResolver, ContextResolvers, RegistrationError};
