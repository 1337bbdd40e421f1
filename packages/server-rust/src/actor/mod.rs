//! Minimal virtual-actor runtime.
//!
//! Grains are addressed by [`GrainId`] and hosted by every [`Silo`] in an
//! [`InProcessNetwork`]; a call is placed on one silo by hashing the grain
//! id. Calls always travel as encoded `MsgPack` frames and each inbound call
//! runs on a freshly spawned task, so nothing on the caller's task (in
//! particular its ambient slots) reaches the callee unless it was written
//! into the envelope's [`CallMetadata`].
//!
//! Request path:
//!
//! 1. [`ActorClient`] builds an [`ActorCall`] with empty metadata.
//! 2. Outbound pipeline: outgoing context interceptors, then
//!    [`NetworkDispatch`] (encode, place, deliver).
//! 3. [`Silo::receive`] decodes and spawns the inbound pipeline:
//!    ambient restore, turn span, incoming context interceptors, then
//!    [`GrainRouter`].

pub mod client;
pub mod codec;
pub mod network;
pub mod restore;
pub mod router;
pub mod silo;
pub mod span;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use ambit_core::CallMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::ActorClient;
pub use network::{InProcessNetwork, NetworkDispatch};
pub use restore::AmbientRestoreLayer;
pub use router::GrainRouter;
pub use silo::Silo;
pub use span::TurnSpanLayer;

/// Boxed future returned by actor pipeline services.
pub type ActorFuture<T> = Pin<Box<dyn Future<Output = Result<T, ActorError>> + Send>>;

// ---------------------------------------------------------------------------
// Addressing and envelopes
// ---------------------------------------------------------------------------

/// Address of a virtual actor: its type plus a key unique within that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainId {
    pub grain_type: String,
    pub key: String,
}

impl GrainId {
    #[must_use]
    pub fn new(grain_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            grain_type: grain_type.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for GrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.grain_type, self.key)
    }
}

/// Wire envelope of one actor call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorCall {
    pub call_id: u64,
    pub target: GrainId,
    pub method: String,
    /// Ambient context propagated with the call.
    pub metadata: CallMetadata,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

/// Wire envelope of a reply. Faults cross the wire as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActorReply {
    Ok(#[serde(with = "serde_bytes")] Vec<u8>),
    Fault(String),
}

/// Successful result of a call as seen by pipeline services.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorResponse {
    pub call_id: u64,
    pub payload: Vec<u8>,
}

/// A decoded call on the receiving silo, with a client for nested calls.
#[derive(Clone)]
pub struct InboundCall {
    pub call: ActorCall,
    pub client: ActorClient,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("no grain registered for type {grain_type}")]
    UnknownGrain { grain_type: String },
    #[error("grain type {grain_type} has no method {method}")]
    UnknownMethod { grain_type: String, method: String },
    #[error("no silo available to host {target}")]
    NoSilo { target: String },
    #[error("codec error: {0}")]
    Codec(String),
    #[error("grain failed: {0}")]
    Grain(String),
    #[error("call to {target} failed remotely: {message}")]
    Remote { target: String, message: String },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Grain
// ---------------------------------------------------------------------------

/// What a grain sees while executing one turn.
#[derive(Clone)]
pub struct GrainContext {
    pub id: GrainId,
    pub method: String,
    /// Client for calls made from within this turn.
    pub client: ActorClient,
}

/// A virtual actor type. One instance serves every key of its type.
#[async_trait]
pub trait Grain: Send + Sync + 'static {
    /// Executes `ctx.method` with an encoded request, returning the encoded
    /// response.
    async fn invoke(&self, ctx: &GrainContext, payload: &[u8]) -> Result<Vec<u8>, ActorError>;
}
