//! A silo: one node hosting grains.

use tower::ServiceExt;
use tracing::debug;

use super::{codec, ActorCall, ActorClient, ActorError, ActorReply, GrainRouter, InboundCall};
use crate::interceptor::build_inbound_pipeline;

/// A node of the in-process cluster.
///
/// Receives encoded [`ActorCall`] frames and answers with encoded
/// [`ActorReply`] frames. Grain failures become `ActorReply::Fault`; only
/// frame-level problems surface as `Err`.
pub struct Silo {
    node_id: String,
    router: GrainRouter,
}

impl Silo {
    #[must_use]
    pub fn new(node_id: impl Into<String>, router: GrainRouter) -> Self {
        Self {
            node_id: node_id.into(),
            router,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Executes one encoded call as a turn on a freshly spawned task.
    ///
    /// # Errors
    ///
    /// Returns `ActorError::Codec` if the frame cannot be decoded, or
    /// `ActorError::Internal` if the turn task panicked.
    pub async fn receive(&self, frame: &[u8], client: ActorClient) -> Result<Vec<u8>, ActorError> {
        let call: ActorCall = codec::decode(frame)?;
        debug!(
            node_id = %self.node_id,
            call_id = call.call_id,
            grain = %call.target,
            method = %call.method,
            "received actor call"
        );

        let pipeline = build_inbound_pipeline(self.router.clone());
        let turn = tokio::spawn(pipeline.oneshot(InboundCall { call, client }));
        let reply = match turn.await {
            Ok(Ok(response)) => ActorReply::Ok(response.payload),
            Ok(Err(error)) => ActorReply::Fault(error.to_string()),
            Err(join_error) => {
                return Err(ActorError::Internal(anyhow::anyhow!(
                    "actor turn on {} aborted: {join_error}",
                    self.node_id
                )));
            }
        };
        codec::encode(&reply)
    }
}

impl std::fmt::Debug for Silo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Silo").field("node_id", &self.node_id).finish_non_exhaustive()
    }
}
