//! Turn span middleware for inbound actor calls.
//!
//! Wraps every turn in an `actor_turn` span recording duration and outcome.
//! The span is entered inside the restored ambient scope, so telemetry
//! enrichment on span close sees the turn's context.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use super::{ActorError, ActorFuture, ActorResponse, InboundCall};

// ---------------------------------------------------------------------------
// TurnSpanLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct TurnSpanLayer;

impl<S> Layer<S> for TurnSpanLayer {
    type Service = TurnSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TurnSpanService { inner }
    }
}

// ---------------------------------------------------------------------------
// TurnSpanService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TurnSpanService<S> {
    inner: S,
}

impl<S> Service<InboundCall> for TurnSpanService<S>
where
    S: Service<InboundCall, Response = ActorResponse, Error = ActorError> + Send,
    S::Future: Send + 'static,
{
    type Response = ActorResponse;
    type Error = ActorError;
    type Future = ActorFuture<ActorResponse>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inbound: InboundCall) -> Self::Future {
        let call_id = inbound.call.call_id;
        let span = info_span!(
            "actor_turn",
            grain = %inbound.call.target,
            method = %inbound.call.method,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = {
            let _entered = span.enter();
            self.inner.call(inbound)
        };

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                let outcome = if result.is_ok() { "ok" } else { "error" };

                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);

                result
            }
            .instrument(span),
        )
    }
}
