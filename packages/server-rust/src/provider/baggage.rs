//! Providers reading W3C trace baggage captured at HTTP ingress.

use std::marker::PhantomData;

use ambit_core::ContextKind;

use super::{ContextProvider, ProviderError, BAGGAGE_PRIORITY};
use crate::ambient::HttpChannel;

/// Reads `K` from the request's `baggage` header, using the same keys as
/// call metadata (e.g. `tenant.name=t1`).
pub struct BaggageProvider<K> {
    priority: i32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ContextKind> BaggageProvider<K> {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            _kind: PhantomData,
        }
    }
}

impl<K: ContextKind> Default for BaggageProvider<K> {
    fn default() -> Self {
        Self::new(BAGGAGE_PRIORITY)
    }
}

impl<K: ContextKind> ContextProvider<K> for BaggageProvider<K> {
    fn name(&self) -> &'static str {
        "trace-baggage"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn lookup(&self) -> Result<Option<K::Value>, ProviderError> {
        match HttpChannel::baggage() {
            Some(baggage) => K::read(&baggage).map_err(|error| ProviderError::Malformed {
                source_name: "trace baggage",
                error,
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use ambit_core::{baggage, Correlation, CorrelationId, Tenant};

    use super::*;
    use crate::ambient::RequestItems;

    #[test]
    fn reads_kind_from_baggage() {
        let items = RequestItems {
            baggage: baggage::parse("tenant.name=t9,correlation.id=c-1"),
            ..RequestItems::default()
        };
        HttpChannel::sync_scope(items, || {
            let tenant = BaggageProvider::<Tenant>::default().lookup().unwrap();
            assert_eq!(tenant.map(|t| t.name), Some("t9".to_string()));
            let correlation = BaggageProvider::<Correlation>::default().lookup().unwrap();
            assert_eq!(correlation, Some(CorrelationId::new("c-1")));
        });
    }
}
