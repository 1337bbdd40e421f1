//! Outgoing interceptor: snapshot resolved context into the call envelope.

use std::sync::Arc;
use std::task::{Context, Poll};

use ambit_core::ContextKind;
use tower::{Layer, Service};
use tracing::trace;

use crate::actor::ActorCall;
use crate::resolver::ContextResolver;

/// Writes the current value of kind `K` into every outbound call's metadata.
///
/// When nothing resolves the kind's keys are removed, so an envelope never
/// carries a value left over from an unrelated call. The interceptor never
/// fails or delays a call.
pub struct OutgoingContextLayer<K: ContextKind> {
    resolver: Arc<ContextResolver<K>>,
}

impl<K: ContextKind> OutgoingContextLayer<K> {
    #[must_use]
    pub fn new(resolver: Arc<ContextResolver<K>>) -> Self {
        Self { resolver }
    }
}

impl<K: ContextKind> Clone for OutgoingContextLayer<K> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<K: ContextKind, S> Layer<S> for OutgoingContextLayer<K> {
    type Service = OutgoingContextService<K, S>;

    fn layer(&self, inner: S) -> Self::Service {
        OutgoingContextService {
            resolver: Arc::clone(&self.resolver),
            inner,
        }
    }
}

pub struct OutgoingContextService<K: ContextKind, S> {
    resolver: Arc<ContextResolver<K>>,
    inner: S,
}

impl<K: ContextKind, S: Clone> Clone for OutgoingContextService<K, S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            inner: self.inner.clone(),
        }
    }
}

impl<K, S> Service<ActorCall> for OutgoingContextService<K, S>
where
    K: ContextKind,
    S: Service<ActorCall>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut call: ActorCall) -> Self::Future {
        // Resolution happens here, on the caller's task, before dispatch.
        let value = self.resolver.try_resolve();
        trace!(
            kind = K::NAME,
            grain = %call.target,
            method = %call.method,
            present = value.is_some(),
            "propagating ambient context"
        );
        K::store(value.as_ref(), &mut call.metadata);
        self.inner.call(call)
    }
}
