//! Telemetry enrichment: ambient context tags on every finished span and log
//! record.
//!
//! [`AmbientTelemetryLayer`] is a `tracing_subscriber` layer. When a span
//! closes, or an event is recorded, it builds a [`TelemetryRecord`], runs the
//! [`TelemetryPipeline`] enrichers against the ambient context of the current
//! call, and hands the record to a [`TelemetrySink`].

pub mod enricher;
pub mod layer;
pub mod record;
pub mod sink;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub use enricher::{ContextTagEnricher, TelemetryEnricher, TelemetryPipeline};
pub use layer::AmbientTelemetryLayer;
pub use record::{RecordKind, Tag, TelemetryRecord};
pub use sink::{JsonLinesSink, MemorySink, TelemetrySink};

/// Records emitted from this module are never fed back into the pipeline.
pub(crate) const SELF_TARGET: &str = "ambit_server::telemetry";

/// Tag keys written by the context enrichers.
pub mod tags {
    pub const IDENTITY_ID: &str = "identity.id";
    pub const TENANT_NAME: &str = "tenant.name";
    pub const CORRELATION_ID: &str = "correlation.id";
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("enricher {enricher} failed: {message}")]
    Enricher {
        enricher: &'static str,
        message: String,
    },
    #[error("telemetry sink failed: {0}")]
    Sink(String),
}

/// Installs the global subscriber: `RUST_LOG` filter (default `info`), a
/// plain or JSON formatter on stdout, and the ambient telemetry layer.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(json: bool, pipeline: TelemetryPipeline) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(AmbientTelemetryLayer::new(pipeline))
        .try_init()?;
    Ok(())
}
