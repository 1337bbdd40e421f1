//! In-process cluster: silo membership, placement, and frame delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use ambit_core::placement::owner_index;
use dashmap::DashMap;
use tower::Service;
use tracing::info;

use super::{
    codec, ActorCall, ActorClient, ActorError, ActorFuture, ActorReply, ActorResponse, GrainId,
    Silo,
};
use crate::resolver::ContextResolvers;

/// Set of silos reachable from this process.
///
/// Every silo hosts every registered grain type; a grain's owner is chosen by
/// hashing its id over the sorted node ids.
pub struct InProcessNetwork {
    silos: DashMap<String, Arc<Silo>>,
    resolvers: ContextResolvers,
    next_call_id: AtomicU64,
}

impl InProcessNetwork {
    #[must_use]
    pub fn new(resolvers: ContextResolvers) -> Arc<Self> {
        Arc::new(Self {
            silos: DashMap::new(),
            resolvers,
            next_call_id: AtomicU64::new(1),
        })
    }

    /// Adds (or replaces) a silo.
    pub fn add_silo(&self, silo: Silo) {
        info!(node_id = %silo.node_id(), "silo joined");
        self.silos.insert(silo.node_id().to_string(), Arc::new(silo));
    }

    /// Removes a silo. Returns whether it was present.
    pub fn remove_silo(&self, node_id: &str) -> bool {
        let removed = self.silos.remove(node_id).is_some();
        if removed {
            info!(node_id, "silo left");
        }
        removed
    }

    /// Node ids in placement order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.silos.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Silo owning `target`.
    ///
    /// # Errors
    ///
    /// Returns `ActorError::NoSilo` when the network is empty.
    pub fn place(&self, target: &GrainId) -> Result<Arc<Silo>, ActorError> {
        let no_silo = || ActorError::NoSilo {
            target: target.to_string(),
        };
        let ids = self.node_ids();
        let index = owner_index(&target.to_string(), ids.len()).ok_or_else(no_silo)?;
        self.silos
            .get(&ids[index])
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(no_silo)
    }

    /// Client issuing calls through this network.
    #[must_use]
    pub fn client(self: &Arc<Self>) -> ActorClient {
        ActorClient::new(Arc::clone(self))
    }

    pub fn next_call_id(&self) -> u64 {
        self.next_call_id.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn resolvers(&self) -> &ContextResolvers {
        &self.resolvers
    }
}

impl std::fmt::Debug for InProcessNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessNetwork")
            .field("nodes", &self.node_ids())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// NetworkDispatch
// ---------------------------------------------------------------------------

/// Innermost outbound service: encodes the envelope, delivers it to the
/// owning silo and decodes the reply.
///
/// Only the encoded frame reaches the silo, so the envelope's metadata is
/// the sole carrier of ambient context across the hop.
#[derive(Debug, Clone)]
pub struct NetworkDispatch {
    network: Arc<InProcessNetwork>,
}

impl NetworkDispatch {
    #[must_use]
    pub fn new(network: Arc<InProcessNetwork>) -> Self {
        Self { network }
    }
}

impl Service<ActorCall> for NetworkDispatch {
    type Response = ActorResponse;
    type Error = ActorError;
    type Future = ActorFuture<ActorResponse>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: ActorCall) -> Self::Future {
        let network = Arc::clone(&self.network);
        Box::pin(async move {
            let silo = network.place(&call.target)?;
            let frame = codec::encode(&call)?;
            let reply = silo.receive(&frame, network.client()).await?;
            match codec::decode::<ActorReply>(&reply)? {
                ActorReply::Ok(payload) => Ok(ActorResponse {
                    call_id: call.call_id,
                    payload,
                }),
                ActorReply::Fault(message) => Err(ActorError::Remote {
                    target: call.target.to_string(),
                    message,
                }),
            }
        })
    }
}
