//! Claims enrichment: merge profile data and current-tenant roles into a
//! principal.
//!
//! Runs once per principal. The `ambit:enriched` marker claim makes a second
//! pass a no-op, which also breaks recursion if resolving claims ends up
//! re-entering enrichment. Enrichment fails open: a directory error is
//! logged and the principal is returned as it was.

use std::sync::Arc;

use ambit_core::{claim_types, Claim, ClaimsPrincipal, TenantContext};
use tracing::{debug, warn};

use crate::actor::ActorError;
use crate::directory::IdentityDirectory;
use crate::resolver::TenantResolver;

/// Value of the marker claim.
const ENRICHED_VALUE: &str = "true";

pub struct ClaimsEnricher {
    directory: Arc<dyn IdentityDirectory>,
    tenant: Arc<TenantResolver>,
}

impl ClaimsEnricher {
    #[must_use]
    pub fn new(directory: Arc<dyn IdentityDirectory>, tenant: Arc<TenantResolver>) -> Self {
        Self { directory, tenant }
    }

    /// Enriches `principal` for the tenant resolved on the current call.
    ///
    /// Returns the principal unchanged when it is already marked, has no
    /// subject, no tenant resolves, or the identity directory fails.
    pub async fn enrich(&self, principal: ClaimsPrincipal) -> ClaimsPrincipal {
        if principal.is_enriched() {
            return principal;
        }
        let Some(subject) = principal.subject().map(str::to_string) else {
            return principal;
        };
        let Some(tenant) = self.tenant.try_resolve() else {
            debug!(subject = %subject, "no tenant resolved; skipping claims enrichment");
            return principal;
        };

        match self.enriched(&principal, &subject, &tenant).await {
            Ok(enriched) => enriched,
            Err(error) => {
                warn!(
                    subject = %subject,
                    tenant = %tenant.name,
                    error = %error,
                    "claims enrichment failed; continuing with original principal"
                );
                principal
            }
        }
    }

    async fn enriched(
        &self,
        principal: &ClaimsPrincipal,
        subject: &str,
        tenant: &TenantContext,
    ) -> Result<ClaimsPrincipal, ActorError> {
        let profile = self.directory.get_profile(subject).await?;
        let memberships = self.directory.get_tenant_memberships(subject).await?;

        let mut enriched = principal.clone();
        if let Some(profile) = profile {
            if !enriched.has_kind(claim_types::EMAIL) {
                enriched.add_unique(claim_types::EMAIL, &profile.email);
            }
            if !enriched.has_kind(claim_types::NAME) {
                enriched.add_unique(claim_types::NAME, &profile.display_name);
            }
        }
        for membership in &memberships {
            enriched.add_unique(claim_types::TENANT, &membership.tenant_name);
        }
        let roles = memberships
            .iter()
            .filter(|m| m.tenant_name == tenant.name)
            .flat_map(|m| m.roles.iter());
        for role in roles {
            enriched.add_unique(claim_types::ROLE, role);
        }

        enriched.push(Claim::new(claim_types::ENRICHED, ENRICHED_VALUE));
        debug!(
            subject = %subject,
            tenant = %tenant.name,
            claims = enriched.claims().len(),
            "principal enriched"
        );
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ambit_core::Tenant;
    use async_trait::async_trait;

    use super::*;
    use crate::ambient::{AmbientChannelExt, HttpChannel, RequestItems};
    use crate::directory::{TenantMembership, UserProfile};
    use crate::resolver::ContextResolvers;

    /// Directory double counting remote calls.
    #[derive(Default)]
    struct CountingDirectory {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl IdentityDirectory for CountingDirectory {
        async fn get_profile(&self, subject_id: &str) -> Result<Option<UserProfile>, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ActorError::Remote {
                    target: format!("identity/{subject_id}"),
                    message: "unavailable".to_string(),
                });
            }
            Ok(Some(UserProfile {
                subject_id: subject_id.to_string(),
                email: "alice@example.com".to_string(),
                display_name: "Alice".to_string(),
            }))
        }

        async fn get_tenant_memberships(
            &self,
            _subject_id: &str,
        ) -> Result<Vec<TenantMembership>, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                TenantMembership::new("t1", &["admin", "reader"]),
                TenantMembership::new("t2", &["owner"]),
            ])
        }
    }

    fn enricher(directory: Arc<CountingDirectory>) -> ClaimsEnricher {
        ClaimsEnricher::new(directory, ContextResolvers::standard().unwrap().tenant)
    }

    async fn in_tenant<F: std::future::Future>(name: &str, fut: F) -> F::Output {
        HttpChannel::scope(RequestItems::default(), async {
            HttpChannel.set::<Tenant>(Some(&TenantContext::named(name)));
            fut.await
        })
        .await
    }

    #[tokio::test]
    async fn merges_profile_and_current_tenant_roles() {
        let directory = Arc::new(CountingDirectory::default());
        let enricher = enricher(Arc::clone(&directory));

        let enriched = in_tenant("t1", enricher.enrich(ClaimsPrincipal::with_subject("u-1"))).await;

        assert!(enriched.is_enriched());
        let identity = enriched.to_identity().unwrap();
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.display_name, "Alice");
        assert_eq!(identity.roles, vec!["admin", "reader"]);
        assert_eq!(identity.tenants, vec!["t1", "t2"]);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_pass_makes_no_calls_and_adds_nothing() {
        let directory = Arc::new(CountingDirectory::default());
        let enricher = enricher(Arc::clone(&directory));

        let (first, second) = in_tenant("t1", async {
            let first = enricher.enrich(ClaimsPrincipal::with_subject("u-1")).await;
            let second = enricher.enrich(first.clone()).await;
            (first, second)
        })
        .await;

        assert_eq!(first, second);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn existing_profile_claims_are_kept() {
        let directory = Arc::new(CountingDirectory::default());
        let enricher = enricher(directory);
        let mut principal = ClaimsPrincipal::with_subject("u-1");
        principal.add_unique(claim_types::EMAIL, "token@example.com");

        let enriched = in_tenant("t2", enricher.enrich(principal)).await;
        let identity = enriched.to_identity().unwrap();
        assert_eq!(identity.email, "token@example.com");
        assert_eq!(identity.roles, vec!["owner"]);
    }

    #[tokio::test]
    async fn directory_failure_returns_original_principal() {
        let directory = Arc::new(CountingDirectory {
            fail: true,
            ..CountingDirectory::default()
        });
        let enricher = enricher(directory);
        let original = ClaimsPrincipal::with_subject("u-1");

        let result = in_tenant("t1", enricher.enrich(original.clone())).await;
        assert_eq!(result, original);
        assert!(!result.is_enriched());
    }

    #[tokio::test]
    async fn without_tenant_or_subject_nothing_happens() {
        let directory = Arc::new(CountingDirectory::default());
        let enricher = enricher(Arc::clone(&directory));

        let no_tenant = enricher.enrich(ClaimsPrincipal::with_subject("u-1")).await;
        assert!(!no_tenant.is_enriched());
        let no_subject = in_tenant("t1", enricher.enrich(ClaimsPrincipal::default())).await;
        assert!(!no_subject.is_enriched());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }
}
