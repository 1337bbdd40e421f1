//! `tracing_subscriber` layer feeding finished spans and events into the
//! telemetry pipeline.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::{RecordKind, TelemetryPipeline, TelemetryRecord, SELF_TARGET};

thread_local! {
    /// Set while the pipeline runs on this thread. Events emitted by the
    /// pipeline itself (e.g. a provider warning) are not processed again.
    static PROCESSING: Cell<bool> = const { Cell::new(false) };
}

struct ProcessingGuard;

impl ProcessingGuard {
    fn acquire() -> Option<Self> {
        (!PROCESSING.with(|p| p.replace(true))).then_some(Self)
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        PROCESSING.with(|p| p.set(false));
    }
}

/// Fields recorded on a span so far, kept in the span's extensions.
#[derive(Debug, Default)]
struct SpanFields(BTreeMap<String, String>);

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Runs the pipeline on span close and on every event.
///
/// Both hooks fire on the task that owns the span or event, so the
/// enrichers resolve against that call's ambient slots.
pub struct AmbientTelemetryLayer {
    pipeline: TelemetryPipeline,
}

impl AmbientTelemetryLayer {
    #[must_use]
    pub fn new(pipeline: TelemetryPipeline) -> Self {
        Self { pipeline }
    }

    fn process(&self, record: TelemetryRecord) {
        if let Some(_guard) = ProcessingGuard::acquire() {
            self.pipeline.process(record);
        }
    }

    fn record(
        kind: RecordKind,
        name: String,
        meta: &Metadata<'_>,
        fields: BTreeMap<String, String>,
    ) -> TelemetryRecord {
        let mut record = TelemetryRecord::new(kind, name, meta.target());
        record.level = meta.level().to_string();
        record.fields = fields;
        record
    }
}

fn is_own(meta: &Metadata<'_>) -> bool {
    meta.target().starts_with(SELF_TARGET)
}

impl<S> Layer<S> for AmbientTelemetryLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if is_own(attrs.metadata()) {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut FieldVisitor(&mut fields.0));
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(fields) = span.extensions_mut().get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor(&mut fields.0));
        };
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own(meta) {
            return;
        }
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let name = fields
            .remove("message")
            .unwrap_or_else(|| meta.name().to_string());
        self.process(Self::record(RecordKind::Event, name, meta, fields));
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let Some(SpanFields(fields)) = span.extensions_mut().remove::<SpanFields>() else {
            return;
        };
        let meta = span.metadata();
        self.process(Self::record(RecordKind::Span, span.name().to_string(), meta, fields));
    }
}
