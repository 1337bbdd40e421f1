//! Incoming interceptor: observe the context restored for a turn.

use std::marker::PhantomData;
use std::task::{Context, Poll};

use ambit_core::ContextKind;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::actor::InboundCall;
use crate::ambient::{ActorChannel, AmbientChannelExt};

/// Logs whether a value of kind `K` arrived with the call, tagged with the
/// grain and method. Never alters the call or the slot.
pub struct IncomingContextLayer<K: ContextKind> {
    _kind: PhantomData<fn() -> K>,
}

impl<K: ContextKind> IncomingContextLayer<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<K: ContextKind> Default for IncomingContextLayer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ContextKind> Clone for IncomingContextLayer<K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K: ContextKind, S> Layer<S> for IncomingContextLayer<K> {
    type Service = IncomingContextService<K, S>;

    fn layer(&self, inner: S) -> Self::Service {
        IncomingContextService {
            inner,
            _kind: PhantomData,
        }
    }
}

pub struct IncomingContextService<K: ContextKind, S> {
    inner: S,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ContextKind, S: Clone> Clone for IncomingContextService<K, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K, S> Service<InboundCall> for IncomingContextService<K, S>
where
    K: ContextKind,
    S: Service<InboundCall>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inbound: InboundCall) -> Self::Future {
        let target = &inbound.call.target;
        match ActorChannel.try_get::<K>() {
            Ok(Some(value)) => debug!(
                kind = K::NAME,
                grain_type = %target.grain_type,
                grain_key = %target.key,
                method = %inbound.call.method,
                value = ?value,
                "ambient context present"
            ),
            Ok(None) => debug!(
                kind = K::NAME,
                grain_type = %target.grain_type,
                grain_key = %target.key,
                method = %inbound.call.method,
                "ambient context absent"
            ),
            Err(error) => warn!(
                kind = K::NAME,
                grain_type = %target.grain_type,
                grain_key = %target.key,
                method = %inbound.call.method,
                error = %error,
                "ambient context malformed"
            ),
        }
        self.inner.call(inbound)
    }
}
