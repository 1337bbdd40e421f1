//! Pipeline composition for both directions of an actor call.

use std::sync::Arc;

use ambit_core::{Correlation, Identity, Tenant};
use tower::{Service, ServiceBuilder};

use super::{IncomingContextLayer, OutgoingContextLayer};
use crate::actor::{
    ActorCall, ActorError, ActorFuture, ActorResponse, AmbientRestoreLayer, GrainRouter,
    InProcessNetwork, InboundCall, NetworkDispatch, TurnSpanLayer,
};

/// Builds the caller-side pipeline.
///
/// Layer order (outermost to innermost):
/// 1. `OutgoingContextLayer<Identity>`
/// 2. `OutgoingContextLayer<Tenant>`
/// 3. `OutgoingContextLayer<Correlation>`
/// 4. `NetworkDispatch` -- encode, place, deliver, decode the reply
#[must_use]
pub fn build_outbound_pipeline(
    network: Arc<InProcessNetwork>,
) -> impl Service<ActorCall, Response = ActorResponse, Error = ActorError, Future = ActorFuture<ActorResponse>>
       + Send
       + 'static {
    let resolvers = network.resolvers().clone();
    ServiceBuilder::new()
        .layer(OutgoingContextLayer::<Identity>::new(resolvers.identity))
        .layer(OutgoingContextLayer::<Tenant>::new(resolvers.tenant))
        .layer(OutgoingContextLayer::<Correlation>::new(resolvers.correlation))
        .service(NetworkDispatch::new(network))
}

/// Builds the silo-side pipeline around `router`.
///
/// Layer order (outermost to innermost):
/// 1. `AmbientRestoreLayer` -- the turn's slot becomes the envelope metadata
/// 2. `TurnSpanLayer` -- span with timing and outcome
/// 3. `IncomingContextLayer` for identity, tenant, correlation
/// 4. `GrainRouter`
#[must_use]
pub fn build_inbound_pipeline(
    router: GrainRouter,
) -> impl Service<InboundCall, Response = ActorResponse, Error = ActorError, Future = ActorFuture<ActorResponse>>
       + Send
       + 'static {
    ServiceBuilder::new()
        .layer(AmbientRestoreLayer)
        .layer(TurnSpanLayer)
        .layer(IncomingContextLayer::<Identity>::new())
        .layer(IncomingContextLayer::<Tenant>::new())
        .layer(IncomingContextLayer::<Correlation>::new())
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ambit_core::{ContextKind, CorrelationId, IdentityContext, TenantContext};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::actor::{codec, Grain, GrainContext, GrainId, Silo};
    use crate::ambient::{ActorChannel, AmbientChannelExt, HttpChannel, RequestItems};
    use crate::resolver::ContextResolvers;

    /// What one hop observed through the resolvers.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Seen {
        key: String,
        identity: Option<String>,
        tenant: Option<String>,
        correlation: Option<String>,
    }

    /// `Relay` forwards to the next key in the payload path and returns what
    /// every hop saw. `Retag` switches the tenant mid-turn, then relays.
    struct Relay;

    fn observe(ctx: &GrainContext) -> Seen {
        let resolvers = ctx.client.network().resolvers();
        Seen {
            key: ctx.id.key.clone(),
            identity: resolvers.identity.try_resolve().map(|i| i.subject_id),
            tenant: resolvers.tenant.try_resolve().map(|t| t.name),
            correlation: resolvers.correlation.try_resolve().map(|c| c.0),
        }
    }

    #[async_trait]
    impl Grain for Relay {
        async fn invoke(&self, ctx: &GrainContext, payload: &[u8]) -> Result<Vec<u8>, ActorError> {
            match ctx.method.as_str() {
                "Relay" => {
                    let mut path: Vec<String> = codec::decode(payload)?;
                    let mut seen = vec![observe(ctx)];
                    if !path.is_empty() {
                        let next = path.remove(0);
                        let rest: Vec<Seen> = ctx
                            .client
                            .call(GrainId::new("relay", next), "Relay", &path)
                            .await?;
                        seen.extend(rest);
                    }
                    codec::encode(&seen)
                }
                "Retag" => {
                    let tenant: String = codec::decode(payload)?;
                    ActorChannel.set::<Tenant>(Some(&TenantContext::named(tenant)));
                    let rest: Vec<Seen> = ctx
                        .client
                        .call(GrainId::new("relay", "after-retag"), "Relay", &Vec::<String>::new())
                        .await?;
                    codec::encode(&rest)
                }
                "Fail" => Err(ActorError::Grain("relay refused".to_string())),
                other => Err(ActorError::UnknownMethod {
                    grain_type: ctx.id.grain_type.clone(),
                    method: other.to_string(),
                }),
            }
        }
    }

    fn cluster() -> Arc<InProcessNetwork> {
        let network = InProcessNetwork::new(ContextResolvers::standard().unwrap());
        for node in ["node-a", "node-b", "node-c"] {
            network.add_silo(Silo::new(node, GrainRouter::new().with("relay", Relay)));
        }
        network
    }

    fn request(subject: &str, tenant: &str, correlation: &str) -> RequestItems {
        let mut items = RequestItems::default();
        Identity::store(Some(&IdentityContext::new(subject)), &mut items.slot);
        Tenant::store(Some(&TenantContext::named(tenant)), &mut items.slot);
        Correlation::store(Some(&CorrelationId::new(correlation)), &mut items.slot);
        items
    }

    async fn relay(network: &Arc<InProcessNetwork>, first: &str, rest: &[&str]) -> Vec<Seen> {
        let path: Vec<String> = rest.iter().map(|s| (*s).to_string()).collect();
        network
            .client()
            .call(GrainId::new("relay", first), "Relay", &path)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn context_reaches_every_hop_of_a_chain() {
        let network = cluster();
        let seen = HttpChannel::scope(
            request("u-1", "t1", "c-1"),
            relay(&network, "a", &["b", "c", "d"]),
        )
        .await;

        assert_eq!(seen.len(), 4);
        for hop in &seen {
            assert_eq!(hop.identity.as_deref(), Some("u-1"), "hop {}", hop.key);
            assert_eq!(hop.tenant.as_deref(), Some("t1"), "hop {}", hop.key);
            assert_eq!(hop.correlation.as_deref(), Some("c-1"), "hop {}", hop.key);
        }
    }

    #[tokio::test]
    async fn mid_turn_change_is_snapshotted_by_the_next_call() {
        let network = cluster();
        let seen: Vec<Seen> = HttpChannel::scope(request("u-1", "t1", "c-1"), async {
            network
                .client()
                .call(GrainId::new("relay", "x"), "Retag", "t2")
                .await
                .unwrap()
        })
        .await;

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tenant.as_deref(), Some("t2"));
        assert_eq!(seen[0].identity.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn call_without_context_sees_nothing_from_a_previous_call() {
        // Single-threaded runtime: both calls reuse the same worker thread.
        let network = cluster();
        let first =
            HttpChannel::scope(request("u-1", "t1", "c-1"), relay(&network, "a", &["b"])).await;
        assert_eq!(first[1].tenant.as_deref(), Some("t1"));

        let second = relay(&network, "a", &["b"]).await;
        for hop in &second {
            assert_eq!(hop.identity, None);
            assert_eq!(hop.tenant, None);
            assert_eq!(hop.correlation, None);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_never_observe_each_others_context() {
        let network = cluster();
        let mut handles = Vec::new();
        for i in 0..48 {
            let network = Arc::clone(&network);
            handles.push(tokio::spawn(async move {
                let tenant = format!("t{i}");
                let key = format!("k{i}");
                let seen = HttpChannel::scope(
                    request(&format!("u{i}"), &tenant, &format!("c{i}")),
                    relay(&network, &key, &["n1", "n2"]),
                )
                .await;
                (tenant, seen)
            }));
        }

        for handle in handles {
            let (tenant, seen) = handle.await.unwrap();
            assert_eq!(seen.len(), 3);
            for hop in seen {
                assert_eq!(hop.tenant.as_deref(), Some(tenant.as_str()));
            }
        }
    }

    #[tokio::test]
    async fn grain_failure_surfaces_as_remote_error() {
        let network = cluster();
        let err = network
            .client()
            .invoke(GrainId::new("relay", "a"), "Fail", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActorError::Remote { ref target, ref message }
                if target == "relay/a" && message.contains("relay refused")
        ));
    }

    #[tokio::test]
    async fn unknown_grain_type_surfaces_as_remote_error() {
        let network = cluster();
        let err = network
            .client()
            .invoke(GrainId::new("billing", "a"), "Relay", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActorError::Remote { .. }));
    }
}
