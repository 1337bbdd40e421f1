//! Grain routing: dispatches inbound calls to grains by `grain_type`.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use super::{ActorError, ActorFuture, ActorResponse, Grain, GrainContext, InboundCall};

/// Routes [`InboundCall`]s to the grain registered for the target's type.
///
/// Cloning is cheap: the registration table is shared. Calls for an
/// unregistered type fail with `ActorError::UnknownGrain`.
#[derive(Clone, Default)]
pub struct GrainRouter {
    grains: Arc<HashMap<String, Arc<dyn Grain>>>,
}

impl GrainRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `grain` for `grain_type`, replacing any earlier grain.
    pub fn register(&mut self, grain_type: impl Into<String>, grain: impl Grain) {
        Arc::make_mut(&mut self.grains).insert(grain_type.into(), Arc::new(grain));
    }

    /// Builder-style [`GrainRouter::register`].
    #[must_use]
    pub fn with(mut self, grain_type: impl Into<String>, grain: impl Grain) -> Self {
        self.register(grain_type, grain);
        self
    }

    #[must_use]
    pub fn handles(&self, grain_type: &str) -> bool {
        self.grains.contains_key(grain_type)
    }
}

impl Service<InboundCall> for GrainRouter {
    type Response = ActorResponse;
    type Error = ActorError;
    type Future = ActorFuture<ActorResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, inbound: InboundCall) -> Self::Future {
        let InboundCall { call, client } = inbound;
        let Some(grain) = self.grains.get(&call.target.grain_type).cloned() else {
            return Box::pin(async move {
                Err(ActorError::UnknownGrain {
                    grain_type: call.target.grain_type,
                })
            });
        };
        Box::pin(async move {
            let ctx = GrainContext {
                id: call.target,
                method: call.method,
                client,
            };
            let payload = grain.invoke(&ctx, &call.payload).await?;
            Ok(ActorResponse {
                call_id: call.call_id,
                payload,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ambit_core::CallMetadata;
    use async_trait::async_trait;
    use tower::ServiceExt;

    use super::*;
    use crate::actor::{codec, ActorCall, GrainId, InProcessNetwork};
    use crate::resolver::ContextResolvers;

    /// Grain answering with its own type name and the called method.
    struct NameGrain(&'static str);

    #[async_trait]
    impl Grain for NameGrain {
        async fn invoke(&self, ctx: &GrainContext, _payload: &[u8]) -> Result<Vec<u8>, ActorError> {
            codec::encode(&format!("{}:{}:{}", self.0, ctx.id.key, ctx.method))
        }
    }

    fn inbound(grain_type: &str) -> InboundCall {
        let network = InProcessNetwork::new(ContextResolvers::standard().unwrap());
        InboundCall {
            call: ActorCall {
                call_id: 5,
                target: GrainId::new(grain_type, "k1"),
                method: "Ping".to_string(),
                metadata: CallMetadata::new(),
                payload: Vec::new(),
            },
            client: network.client(),
        }
    }

    #[tokio::test]
    async fn routes_to_registered_grain() {
        let router = GrainRouter::new()
            .with("tenant", NameGrain("tenant"))
            .with("identity", NameGrain("identity"));

        let resp = router.oneshot(inbound("identity")).await.unwrap();
        assert_eq!(resp.call_id, 5);
        let body: String = codec::decode(&resp.payload).unwrap();
        assert_eq!(body, "identity:k1:Ping");
    }

    #[tokio::test]
    async fn unknown_grain_type_is_an_error() {
        let router = GrainRouter::new().with("tenant", NameGrain("tenant"));
        let err = router.oneshot(inbound("billing")).await.unwrap_err();
        assert!(matches!(
            err,
            ActorError::UnknownGrain { grain_type } if grain_type == "billing"
        ));
    }

    #[test]
    fn clones_share_registrations() {
        let router = GrainRouter::new().with("tenant", NameGrain("tenant"));
        let copy = router.clone();
        assert!(copy.handles("tenant"));
        assert!(!copy.handles("identity"));
    }
}
