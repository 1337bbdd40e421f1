//! Context resolvers: aggregate a kind's providers into one authoritative
//! value.
//!
//! Every `resolve()`/`try_resolve()` re-scans the providers from highest to
//! lowest priority; nothing is cached between calls, so a resolver can be
//! shared by every concurrent call in the process.

use std::sync::Arc;

use ambit_core::{ContextKind, Correlation, Identity, NotResolved, Tenant};
use tracing::warn;

use crate::provider::{
    ActorChannelProvider, BaggageProvider, ClaimsIdentityProvider, ContextProvider,
    HttpChannelProvider,
};

/// Errors raised while assembling a resolver at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(
        "{kind} providers {existing} and {incoming} share priority {priority}; priorities must be unique"
    )]
    DuplicatePriority {
        kind: &'static str,
        priority: i32,
        existing: &'static str,
        incoming: &'static str,
    },
}

/// Priority-ordered set of providers for one context kind.
pub struct ContextResolver<K: ContextKind> {
    providers: Vec<Arc<dyn ContextProvider<K>>>,
}

impl<K: ContextKind> ContextResolver<K> {
    /// Builds a resolver, ordering providers by descending priority.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::DuplicatePriority` if two providers share
    /// a priority, since their relative order would otherwise depend on
    /// registration order.
    pub fn new(mut providers: Vec<Arc<dyn ContextProvider<K>>>) -> Result<Self, RegistrationError> {
        providers.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        for pair in providers.windows(2) {
            if pair[0].priority() == pair[1].priority() {
                return Err(RegistrationError::DuplicatePriority {
                    kind: K::NAME,
                    priority: pair[0].priority(),
                    existing: pair[0].name(),
                    incoming: pair[1].name(),
                });
            }
        }
        Ok(Self { providers })
    }

    /// Returns the first non-empty value, consulting providers from highest
    /// to lowest priority. A failing provider is logged and skipped.
    #[must_use]
    pub fn try_resolve(&self) -> Option<K::Value> {
        for provider in &self.providers {
            match provider.lookup() {
                Ok(Some(value)) if !K::is_empty(&value) => return Some(value),
                Ok(_) => {}
                Err(error) => {
                    warn!(
                        kind = K::NAME,
                        provider = provider.name(),
                        priority = provider.priority(),
                        error = %error,
                        "context provider failed; deferring to next provider"
                    );
                }
            }
        }
        None
    }

    /// Resolves the value, applying the kind's policy when nothing is found.
    ///
    /// # Errors
    ///
    /// Returns `NotResolved` for kinds whose absence is fatal (identity,
    /// tenant). Correlation never fails and yields the empty id instead.
    pub fn resolve(&self) -> Result<K::Value, NotResolved> {
        match self.try_resolve() {
            Some(value) => Ok(value),
            None => K::when_missing(),
        }
    }

    /// `(name, priority)` of each provider in consultation order.
    pub fn providers(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.providers.iter().map(|p| (p.name(), p.priority()))
    }
}

pub type IdentityResolver = ContextResolver<Identity>;
pub type TenantResolver = ContextResolver<Tenant>;
pub type CorrelationResolver = ContextResolver<Correlation>;

/// The three process-wide resolvers.
#[derive(Clone)]
pub struct ContextResolvers {
    pub identity: Arc<IdentityResolver>,
    pub tenant: Arc<TenantResolver>,
    pub correlation: Arc<CorrelationResolver>,
}

impl ContextResolvers {
    /// Resolvers wired with the built-in providers: propagated actor
    /// metadata first, then the HTTP request, then trace baggage.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError` if the built-in priorities collide.
    pub fn standard() -> Result<Self, RegistrationError> {
        let identity: Vec<Arc<dyn ContextProvider<Identity>>> = vec![
            Arc::new(ActorChannelProvider::<Identity>::default()),
            Arc::new(ClaimsIdentityProvider::default()),
        ];
        let tenant: Vec<Arc<dyn ContextProvider<Tenant>>> = vec![
            Arc::new(ActorChannelProvider::<Tenant>::default()),
            Arc::new(HttpChannelProvider::<Tenant>::default()),
            Arc::new(BaggageProvider::<Tenant>::default()),
        ];
        let correlation: Vec<Arc<dyn ContextProvider<Correlation>>> = vec![
            Arc::new(ActorChannelProvider::<Correlation>::default()),
            Arc::new(HttpChannelProvider::<Correlation>::default()),
            Arc::new(BaggageProvider::<Correlation>::default()),
        ];
        Ok(Self {
            identity: Arc::new(ContextResolver::new(identity)?),
            tenant: Arc::new(ContextResolver::new(tenant)?),
            correlation: Arc::new(ContextResolver::new(correlation)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
