//! HTTP transport: the item bag of the request currently being served.

use std::cell::RefCell;
use std::future::Future;

use ambit_core::{CallMetadata, ClaimsPrincipal};

use super::{AmbientChannel, Transport};

/// Per-request items collected at ingress.
#[derive(Debug, Clone, Default)]
pub struct RequestItems {
    /// Context values written by the ingress middleware.
    pub slot: CallMetadata,
    /// Authenticated principal, once the token has been validated.
    pub principal: Option<ClaimsPrincipal>,
    /// Raw bearer token taken from the `Authorization` header.
    pub bearer_token: Option<String>,
    /// Parsed W3C `baggage` header.
    pub baggage: CallMetadata,
}

tokio::task_local! {
    static REQUEST_ITEMS: RefCell<RequestItems>;
}

/// Handle to the HTTP item bag of the current task.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpChannel;

impl HttpChannel {
    /// Runs `fut` with `items` as the request's bag.
    pub async fn scope<F>(items: RequestItems, fut: F) -> F::Output
    where
        F: Future,
    {
        REQUEST_ITEMS.scope(RefCell::new(items), fut).await
    }

    /// Synchronous variant of [`HttpChannel::scope`].
    pub fn sync_scope<R>(items: RequestItems, f: impl FnOnce() -> R) -> R {
        REQUEST_ITEMS.sync_scope(RefCell::new(items), f)
    }

    /// Reads from the bag; `None` outside a request.
    pub fn with_items<R>(f: impl FnOnce(&RequestItems) -> R) -> Option<R> {
        REQUEST_ITEMS.try_with(|items| f(&items.borrow())).ok()
    }

    /// Mutates the bag. Returns `false` outside a request.
    pub fn update_items(f: impl FnOnce(&mut RequestItems)) -> bool {
        REQUEST_ITEMS
            .try_with(|items| f(&mut items.borrow_mut()))
            .is_ok()
    }

    #[must_use]
    pub fn principal() -> Option<ClaimsPrincipal> {
        Self::with_items(|items| items.principal.clone()).flatten()
    }

    /// Replaces the request's principal. Returns `false` outside a request.
    pub fn set_principal(principal: Option<ClaimsPrincipal>) -> bool {
        Self::update_items(|items| items.principal = principal)
    }

    #[must_use]
    pub fn bearer_token() -> Option<String> {
        Self::with_items(|items| items.bearer_token.clone()).flatten()
    }

    #[must_use]
    pub fn baggage() -> Option<CallMetadata> {
        Self::with_items(|items| items.baggage.clone())
    }
}

impl AmbientChannel for HttpChannel {
    fn transport(&self) -> Transport {
        Transport::Http
    }

    fn snapshot(&self) -> Option<CallMetadata> {
        Self::with_items(|items| items.slot.clone())
    }

    fn update(&self, f: &mut dyn FnMut(&mut CallMetadata)) -> bool {
        Self::update_items(|items| f(&mut items.slot))
    }
}
