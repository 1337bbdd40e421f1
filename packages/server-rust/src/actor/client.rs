//! Actor client: the caller side of a grain call.

use std::sync::Arc;

use ambit_core::CallMetadata;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::ServiceExt;

use super::{codec, ActorCall, ActorError, GrainId, InProcessNetwork};
use crate::interceptor::build_outbound_pipeline;

/// Issues calls to grains through the outbound pipeline.
///
/// Calls start with empty metadata; the outgoing context interceptors fill
/// it from whatever the resolvers see on the calling task.
#[derive(Clone)]
pub struct ActorClient {
    network: Arc<InProcessNetwork>,
}

impl ActorClient {
    #[must_use]
    pub fn new(network: Arc<InProcessNetwork>) -> Self {
        Self { network }
    }

    #[must_use]
    pub fn network(&self) -> &Arc<InProcessNetwork> {
        &self.network
    }

    /// Sends an encoded request and returns the encoded response.
    ///
    /// # Errors
    ///
    /// Returns `ActorError` if no silo can host `target`, the frame cannot be
    /// encoded, or the grain faulted (`ActorError::Remote`).
    pub async fn invoke(
        &self,
        target: GrainId,
        method: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ActorError> {
        let call = ActorCall {
            call_id: self.network.next_call_id(),
            target,
            method: method.into(),
            metadata: CallMetadata::new(),
            payload,
        };
        let response = build_outbound_pipeline(Arc::clone(&self.network))
            .oneshot(call)
            .await?;
        Ok(response.payload)
    }

    /// Typed variant of [`ActorClient::invoke`].
    ///
    /// # Errors
    ///
    /// As [`ActorClient::invoke`], plus `ActorError::Codec` when either side
    /// fails to (de)serialize.
    pub async fn call<Req, Resp>(
        &self,
        target: GrainId,
        method: &str,
        request: &Req,
    ) -> Result<Resp, ActorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = codec::encode(request)?;
        let reply = self.invoke(target, method, payload).await?;
        codec::decode(&reply)
    }
}

impl std::fmt::Debug for ActorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorClient").finish_non_exhaustive()
    }
}
