//! Ambient channels: call-scoped key/value slots holding the context of the
//! current logical call.
//!
//! Two transports implement one contract:
//!
//! - [`HttpChannel`]: the item bag of the HTTP request being served. Written
//!   once at ingress by the middleware stack, read many times.
//! - [`ActorChannel`]: the metadata of the actor turn being executed. It
//!   follows the turn through every `.await`, but does not cross a node
//!   boundary by itself: the outgoing interceptors copy it into the call
//!   envelope and the receiving silo opens a fresh scope from that envelope.
//!
//! Both are backed by `tokio::task_local!` slots that only exist inside a
//! scope opened by a wrapper (`scope` / `sync_scope`). Outside a scope reads
//! return `None` and writes report `false`; there is no process-wide fallback.

pub mod actor;
pub mod http;

use ambit_core::{CallMetadata, ContextKind};

pub use actor::ActorChannel;
pub use http::{HttpChannel, RequestItems};

/// Which transport backs a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Actor,
}

impl Transport {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Actor => "actor",
        }
    }
}

/// Read/write contract shared by both transports.
pub trait AmbientChannel: Send + Sync {
    fn transport(&self) -> Transport;

    /// Copy of the slot for the current call, or `None` outside a scope.
    fn snapshot(&self) -> Option<CallMetadata>;

    /// Mutates the slot for the current call. Returns `false` when no scope
    /// is active.
    fn update(&self, f: &mut dyn FnMut(&mut CallMetadata)) -> bool;

    /// Whether a scope for this transport is active on the current task.
    fn is_active(&self) -> bool {
        self.snapshot().is_some()
    }
}

/// Typed accessors over any [`AmbientChannel`].
pub trait AmbientChannelExt: AmbientChannel {
    /// Reads the value of kind `K`. Decoding failures read as absent; use
    /// [`AmbientChannelExt::try_get`] to observe them.
    fn get<K: ContextKind>(&self) -> Option<K::Value> {
        self.try_get::<K>().ok().flatten()
    }

    /// Reads the value of kind `K`, surfacing malformed metadata.
    ///
    /// # Errors
    ///
    /// Returns the kind's decoding error when the slot holds malformed data.
    fn try_get<K: ContextKind>(&self) -> Result<Option<K::Value>, ambit_core::MetadataError> {
        match self.snapshot() {
            Some(metadata) => K::read(&metadata),
            None => Ok(None),
        }
    }

    /// Replaces the value of kind `K`; `None` clears it. Returns `false`
    /// when no scope is active.
    fn set<K: ContextKind>(&self, value: Option<&K::Value>) -> bool {
        self.update(&mut |metadata| K::store(value, metadata))
    }
}

impl<T: AmbientChannel + ?Sized> AmbientChannelExt for T {}
