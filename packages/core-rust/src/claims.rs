//! Claims-based principal produced by the (external) token validator and
//! enriched by the server before it becomes the ambient identity.

use serde::{Deserialize, Serialize};

use crate::context::IdentityContext;

/// Standard claim kinds.
pub mod claim_types {
    pub const SUBJECT: &str = "sub";
    pub const EMAIL: &str = "email";
    pub const NAME: &str = "name";
    pub const TENANT: &str = "tenant";
    pub const ROLE: &str = "role";
    /// Marker added once a principal has been enriched.
    pub const ENRICHED: &str = "ambit:enriched";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

impl Claim {
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Ordered set of claims describing an authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPrincipal {
    claims: Vec<Claim>,
}

impl ClaimsPrincipal {
    #[must_use]
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// A principal holding only a subject claim.
    #[must_use]
    pub fn with_subject(subject: impl Into<String>) -> Self {
        Self::new(vec![Claim::new(claim_types::SUBJECT, subject)])
    }

    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// First non-empty value of the given claim kind.
    #[must_use]
    pub fn find(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == kind && !c.value.is_empty())
            .map(|c| c.value.as_str())
    }

    /// All values of the given claim kind, in insertion order.
    pub fn values<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    #[must_use]
    pub fn has_claim(&self, kind: &str, value: &str) -> bool {
        self.claims.iter().any(|c| c.kind == kind && c.value == value)
    }

    #[must_use]
    pub fn has_kind(&self, kind: &str) -> bool {
        self.claims.iter().any(|c| c.kind == kind)
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.find(claim_types::SUBJECT)
    }

    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.has_kind(claim_types::ENRICHED)
    }

    pub fn push(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Adds the claim unless an identical one exists. Returns whether it was
    /// added.
    pub fn add_unique(&mut self, kind: &str, value: &str) -> bool {
        if value.is_empty() || self.has_claim(kind, value) {
            return false;
        }
        self.claims.push(Claim::new(kind, value));
        true
    }

    /// Projects the principal onto an identity context. `None` without a
    /// subject claim.
    #[must_use]
    pub fn to_identity(&self) -> Option<IdentityContext> {
        let subject_id = self.subject()?.to_string();
        Some(IdentityContext {
            subject_id,
            email: self.find(claim_types::EMAIL).unwrap_or_default().to_string(),
            display_name: self.find(claim_types::NAME).unwrap_or_default().to_string(),
            tenants: self.values(claim_types::TENANT).map(str::to_string).collect(),
            roles: self.values(claim_types::ROLE).map(str::to_string).collect(),
        })
    }
}
