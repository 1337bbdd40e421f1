//! Enrichers and the pipeline running them.

use std::sync::Arc;

use ambit_core::{ContextKind, Correlation, Identity, Tenant};
use tracing::warn;

use super::{tags, TelemetryError, TelemetryRecord, TelemetrySink};
use crate::resolver::{ContextResolver, ContextResolvers};

/// Adds information to a record before it is emitted.
pub trait TelemetryEnricher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mutates `record`. An error only affects this enricher's tags.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Enricher` when the enricher cannot produce
    /// its tag for a reason other than missing context.
    fn enrich(&self, record: &mut TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Tags a record with the value of context kind `K` resolved for the
/// current call. Nothing is added when the kind does not resolve.
pub struct ContextTagEnricher<K: ContextKind> {
    resolver: Arc<ContextResolver<K>>,
    key: &'static str,
    render: fn(&K::Value) -> String,
}

impl<K: ContextKind> ContextTagEnricher<K> {
    #[must_use]
    pub fn new(
        resolver: Arc<ContextResolver<K>>,
        key: &'static str,
        render: fn(&K::Value) -> String,
    ) -> Self {
        Self {
            resolver,
            key,
            render,
        }
    }
}

impl ContextTagEnricher<Identity> {
    #[must_use]
    pub fn identity(resolver: Arc<ContextResolver<Identity>>) -> Self {
        Self::new(resolver, tags::IDENTITY_ID, |identity| identity.subject_id.clone())
    }
}

impl ContextTagEnricher<Tenant> {
    #[must_use]
    pub fn tenant(resolver: Arc<ContextResolver<Tenant>>) -> Self {
        Self::new(resolver, tags::TENANT_NAME, |tenant| tenant.name.clone())
    }
}

impl ContextTagEnricher<Correlation> {
    #[must_use]
    pub fn correlation(resolver: Arc<ContextResolver<Correlation>>) -> Self {
        Self::new(resolver, tags::CORRELATION_ID, ToString::to_string)
    }
}

impl<K: ContextKind> TelemetryEnricher for ContextTagEnricher<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn enrich(&self, record: &mut TelemetryRecord) -> Result<(), TelemetryError> {
        // NotResolved and the empty correlation id both mean "no tag".
        if let Ok(value) = self.resolver.resolve() {
            if !K::is_empty(&value) {
                record.upsert_tag(self.key, (self.render)(&value));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TelemetryPipeline
// ---------------------------------------------------------------------------

/// Runs every enricher in order, then emits the record.
///
/// A failing enricher is reported and skipped; the record is emitted with
/// whatever tags the remaining enrichers produced.
#[derive(Clone)]
pub struct TelemetryPipeline {
    enrichers: Vec<Arc<dyn TelemetryEnricher>>,
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryPipeline {
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            enrichers: Vec::new(),
            sink,
        }
    }

    /// Pipeline tagging identity, tenant and correlation.
    #[must_use]
    pub fn standard(resolvers: &ContextResolvers, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::new(sink)
            .with_enricher(ContextTagEnricher::identity(Arc::clone(&resolvers.identity)))
            .with_enricher(ContextTagEnricher::tenant(Arc::clone(&resolvers.tenant)))
            .with_enricher(ContextTagEnricher::correlation(Arc::clone(
                &resolvers.correlation,
            )))
    }

    #[must_use]
    pub fn with_enricher(mut self, enricher: impl TelemetryEnricher + 'static) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn process(&self, mut record: TelemetryRecord) {
        for enricher in &self.enrichers {
            if let Err(error) = enricher.enrich(&mut record) {
                warn!(
                    enricher = enricher.name(),
                    record = %record.name,
                    error = %error,
                    "telemetry enricher failed"
                );
            }
        }
        if let Err(error) = self.sink.emit(record) {
            warn!(error = %error, "dropping telemetry record");
        }
    }
}

#[cfg(test)]
mod tests {
    use ambit_core::{CorrelationId, IdentityContext, TenantContext};

    use super::*;
    use crate::ambient::{AmbientChannelExt, HttpChannel, RequestItems};
    use crate::telemetry::{MemorySink, RecordKind};

    struct Broken;

    impl TelemetryEnricher for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn enrich(&self, _record: &mut TelemetryRecord) -> Result<(), TelemetryError> {
            Err(TelemetryError::Enricher {
                enricher: "broken",
                message: "exploded".to_string(),
            })
        }
    }

    /// Writes a fixed tenant tag, as a second enricher targeting the same key.
    struct StaticTenant;

    impl TelemetryEnricher for StaticTenant {
        fn name(&self) -> &'static str {
            "static-tenant"
        }

        fn enrich(&self, record: &mut TelemetryRecord) -> Result<(), TelemetryError> {
            record.upsert_tag(tags::TENANT_NAME, "static");
            Ok(())
        }
    }

    fn record() -> TelemetryRecord {
        TelemetryRecord::new(RecordKind::Event, "request handled", "app")
    }

    #[test]
    fn tags_every_resolved_kind() {
        let resolvers = ContextResolvers::standard().unwrap();
        let sink = Arc::new(MemorySink::new());
        let pipeline = TelemetryPipeline::standard(&resolvers, sink.clone());

        HttpChannel::sync_scope(RequestItems::default(), || {
            HttpChannel.set::<Identity>(Some(&IdentityContext::new("u-1")));
            HttpChannel.set::<Tenant>(Some(&TenantContext::named("t1")));
            HttpChannel.set::<Correlation>(Some(&CorrelationId::new("c-1")));
            pipeline.process(record());
        });

        let emitted = &sink.records()[0];
        assert_eq!(emitted.tag(tags::IDENTITY_ID), Some("u-1"));
        assert_eq!(emitted.tag(tags::TENANT_NAME), Some("t1"));
        assert_eq!(emitted.tag(tags::CORRELATION_ID), Some("c-1"));
    }

    #[test]
    fn unresolved_kinds_are_omitted_and_record_still_emitted() {
        let resolvers = ContextResolvers::standard().unwrap();
        let sink = Arc::new(MemorySink::new());
        TelemetryPipeline::standard(&resolvers, sink.clone()).process(record());

        let emitted = sink.records();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].tags.is_empty());
    }

    #[test]
    fn failing_enricher_does_not_block_the_rest() {
        let resolvers = ContextResolvers::standard().unwrap();
        let sink = Arc::new(MemorySink::new());
        let pipeline = TelemetryPipeline::new(sink.clone())
            .with_enricher(Broken)
            .with_enricher(ContextTagEnricher::tenant(Arc::clone(&resolvers.tenant)));

        HttpChannel::sync_scope(RequestItems::default(), || {
            HttpChannel.set::<Tenant>(Some(&TenantContext::named("t1")));
            pipeline.process(record());
        });

        assert_eq!(sink.records()[0].tag(tags::TENANT_NAME), Some("t1"));
    }

    #[test]
    fn later_enricher_replaces_earlier_tag() {
        let resolvers = ContextResolvers::standard().unwrap();
        let sink = Arc::new(MemorySink::new());
        let pipeline = TelemetryPipeline::new(sink.clone())
            .with_enricher(ContextTagEnricher::tenant(Arc::clone(&resolvers.tenant)))
            .with_enricher(StaticTenant);

        HttpChannel::sync_scope(RequestItems::default(), || {
            HttpChannel.set::<Tenant>(Some(&TenantContext::named("t1")));
            pipeline.process(record());
        });

        let emitted = &sink.records()[0];
        assert_eq!(emitted.tags.len(), 1);
        assert_eq!(emitted.tag(tags::TENANT_NAME), Some("static"));
    }
}
