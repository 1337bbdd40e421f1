//! Context providers: one strategy per ambient source.
//!
//! A provider looks at exactly one source (HTTP item bag, claims principal,
//! trace baggage, actor call metadata) and reports what it finds. `Ok(None)`
//! and empty values mean "defer to the next provider"; an `Err` is a
//! provider failure, which the resolver logs and also treats as a deferral.

pub mod baggage;
pub mod channel;
pub mod claims;

use ambit_core::{ContextKind, MetadataError};

pub use baggage::BaggageProvider;
pub use channel::{ActorChannelProvider, HttpChannelProvider};
pub use claims::ClaimsIdentityProvider;

/// Default priority of providers reading propagated actor call metadata.
pub const ACTOR_PRIORITY: i32 = 300;
/// Default priority of providers reading the HTTP request.
pub const HTTP_PRIORITY: i32 = 200;
/// Default priority of providers reading trace baggage.
pub const BAGGAGE_PRIORITY: i32 = 100;

/// Failure of a single provider lookup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("malformed {source_name} data: {error}")]
    Malformed {
        source_name: &'static str,
        error: MetadataError,
    },
    #[error("provider failed: {0}")]
    Other(String),
}

/// A best-effort lookup of one context kind from one ambient source.
///
/// Providers are constructed once at startup and shared by every call, so
/// they hold no per-call state; `lookup` reads the current call's slot.
pub trait ContextProvider<K: ContextKind>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Higher priorities are consulted first. Priorities are unique per
    /// resolver.
    fn priority(&self) -> i32;

    /// Looks for a value in this provider's source.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the source holds data that cannot be
    /// decoded.
    fn lookup(&self) -> Result<Option<K::Value>, ProviderError>;
}
