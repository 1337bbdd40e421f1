//! Restore-on-receipt: the actor transport's half of propagation.
//!
//! Every inbound call runs inside a fresh [`ActorChannel`] scope holding
//! exactly the metadata that arrived in its envelope. A call without
//! metadata therefore sees an empty slot, never a value left behind by an
//! earlier turn.

use std::task::{Context, Poll};

use tower::{Layer, Service};

use super::{ActorError, ActorFuture, ActorResponse, InboundCall};
use crate::ambient::ActorChannel;

// ---------------------------------------------------------------------------
// AmbientRestoreLayer
// ---------------------------------------------------------------------------

/// Tower layer opening the turn's ambient scope around the inner service.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientRestoreLayer;

impl<S> Layer<S> for AmbientRestoreLayer {
    type Service = AmbientRestoreService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AmbientRestoreService { inner }
    }
}

// ---------------------------------------------------------------------------
// AmbientRestoreService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AmbientRestoreService<S> {
    inner: S,
}

impl<S> Service<InboundCall> for AmbientRestoreService<S>
where
    S: Service<InboundCall, Response = ActorResponse, Error = ActorError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ActorResponse;
    type Error = ActorError;
    type Future = ActorFuture<ActorResponse>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inbound: InboundCall) -> Self::Future {
        // The readied service moves into the scope; a clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let metadata = inbound.call.metadata.clone();
        // Inner layers read the slot inside `call`, so it runs in the scope.
        Box::pin(ActorChannel::scope(metadata, async move {
            inner.call(inbound).await
        }))
    }
}
