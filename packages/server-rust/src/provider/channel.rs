//! Providers reading a context kind straight out of an ambient channel.

use std::marker::PhantomData;

use ambit_core::ContextKind;

use super::{ContextProvider, ProviderError, ACTOR_PRIORITY, HTTP_PRIORITY};
use crate::ambient::{ActorChannel, AmbientChannelExt, HttpChannel};

/// Reads `K` from the metadata restored for the current actor turn.
pub struct ActorChannelProvider<K> {
    priority: i32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ContextKind> ActorChannelProvider<K> {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            _kind: PhantomData,
        }
    }
}

impl<K: ContextKind> Default for ActorChannelProvider<K> {
    fn default() -> Self {
        Self::new(ACTOR_PRIORITY)
    }
}

impl<K: ContextKind> ContextProvider<K> for ActorChannelProvider<K> {
    fn name(&self) -> &'static str {
        "actor-call-metadata"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn lookup(&self) -> Result<Option<K::Value>, ProviderError> {
        ActorChannel
            .try_get::<K>()
            .map_err(|error| ProviderError::Malformed {
                source_name: "actor call metadata",
                error,
            })
    }
}

/// Reads `K` from the slot of the HTTP request being served.
pub struct HttpChannelProvider<K> {
    priority: i32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ContextKind> HttpChannelProvider<K> {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            _kind: PhantomData,
        }
    }
}

impl<K: ContextKind> Default for HttpChannelProvider<K> {
    fn default() -> Self {
        Self::new(HTTP_PRIORITY)
    }
}

impl<K: ContextKind> ContextProvider<K> for HttpChannelProvider<K> {
    fn name(&self) -> &'static str {
        "http-request-items"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn lookup(&self) -> Result<Option<K::Value>, ProviderError> {
        HttpChannel
            .try_get::<K>()
            .map_err(|error| ProviderError::Malformed {
                source_name: "http request items",
                error,
            })
    }
}

#[cfg(test)]
mod tests {
    use ambit_core::{keys, CallMetadata, Identity, Tenant, TenantContext};

    use super::*;
    use crate::ambient::RequestItems;

    #[tokio::test]
    async fn actor_provider_reads_restored_metadata() {
        let mut md = CallMetadata::new();
        md.insert(keys::TENANT_NAME, "t1");
        let found = ActorChannel::scope(md, async {
            ActorChannelProvider::<Tenant>::default().lookup()
        })
        .await
        .unwrap();
        assert_eq!(found, Some(TenantContext::named("t1")));
    }

    #[test]
    fn actor_provider_outside_turn_defers() {
        let found = ActorChannelProvider::<Tenant>::default().lookup().unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn malformed_metadata_is_a_provider_error() {
        let mut md = CallMetadata::new();
        md.insert(keys::IDENTITY_ID, "u-1");
        md.insert(keys::IDENTITY_TENANTS, "{");
        let result = ActorChannel::sync_scope(md, || {
            ActorChannelProvider::<Identity>::default().lookup()
        });
        assert!(matches!(result, Err(ProviderError::Malformed { .. })));
    }

    #[test]
    fn http_provider_reads_request_slot() {
        let mut items = RequestItems::default();
        items.slot.insert(keys::TENANT_NAME, "t2");
        let found = HttpChannel::sync_scope(items, || {
            HttpChannelProvider::<Tenant>::default().lookup()
        })
        .unwrap();
        assert_eq!(found.map(|t| t.name), Some("t2".to_string()));
    }
}
