//! Identity provider backed by the request's claims principal.

use ambit_core::{Identity, IdentityContext};

use super::{ContextProvider, ProviderError, HTTP_PRIORITY};
use crate::ambient::HttpChannel;

/// Projects the HTTP request's principal onto an [`IdentityContext`].
///
/// Only the principal stored in the request bag is consulted; the bearer
/// token is never re-validated here.
pub struct ClaimsIdentityProvider {
    priority: i32,
}

impl ClaimsIdentityProvider {
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self { priority }
    }
}

impl Default for ClaimsIdentityProvider {
    fn default() -> Self {
        Self::new(HTTP_PRIORITY)
    }
}

impl ContextProvider<Identity> for ClaimsIdentityProvider {
    fn name(&self) -> &'static str {
        "http-claims"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn lookup(&self) -> Result<Option<IdentityContext>, ProviderError> {
        Ok(HttpChannel::principal().and_then(|p| p.to_identity()))
    }
}
