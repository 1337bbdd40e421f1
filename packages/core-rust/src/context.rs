//! Context values and the `ContextKind` abstraction.
//!
//! Three ambient facts travel with every logical call: who is calling
//! ([`IdentityContext`]), which tenant they act within ([`TenantContext`]),
//! and a diagnostic [`CorrelationId`]. Each is described by a zero-sized
//! marker type implementing [`ContextKind`], so providers, resolvers and
//! interceptors are written once and instantiated per kind.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::metadata::{keys, CallMetadata, MetadataError};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Identity of the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityContext {
    /// Subject identifier. Empty means "no identity".
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
    /// Names of the tenants the subject is a member of.
    pub tenants: Vec<String>,
    /// Roles held within the current tenant.
    pub roles: Vec<String>,
}

impl IdentityContext {
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Tenant the call acts within.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub id: String,
    /// Tenant name. Empty means "no tenant".
    pub name: String,
    /// Storage or shard identifier used to scope data access.
    pub storage_id: String,
}

impl TenantContext {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        storage_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            storage_id: storage_id.into(),
        }
    }

    /// A tenant known only by name (e.g., from trace baggage).
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Diagnostic correlation identifier. The empty id is the "not resolved"
/// sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// NotResolved
// ---------------------------------------------------------------------------

/// No provider produced a value for a context kind whose absence is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} context could not be resolved")]
pub struct NotResolved {
    pub kind: &'static str,
}

// ---------------------------------------------------------------------------
// ContextKind
// ---------------------------------------------------------------------------

/// Describes one kind of ambient context: its value type, how it is encoded
/// into [`CallMetadata`], and what `resolve()` does when nothing is found.
pub trait ContextKind: Send + Sync + 'static {
    type Value: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Short lowercase name used in logs and errors.
    const NAME: &'static str;

    /// Metadata keys owned by this kind.
    const KEYS: &'static [&'static str];

    /// An empty value means "defer to the next provider".
    fn is_empty(value: &Self::Value) -> bool;

    /// Writes `value` into `metadata`. Callers clear the kind's keys first.
    fn write(value: &Self::Value, metadata: &mut CallMetadata);

    /// Reads a value out of `metadata`; `Ok(None)` when the required key is
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError` when a present key cannot be decoded.
    fn read(metadata: &CallMetadata) -> Result<Option<Self::Value>, MetadataError>;

    /// Outcome of `resolve()` when no provider produced a value.
    ///
    /// # Errors
    ///
    /// Kinds that gate security decisions return `NotResolved`.
    fn when_missing() -> Result<Self::Value, NotResolved>;

    /// Removes every key this kind owns.
    fn clear(metadata: &mut CallMetadata) {
        metadata.remove_all(Self::KEYS);
    }

    /// Replaces this kind's keys with `value`, or clears them on `None`.
    fn store(value: Option<&Self::Value>, metadata: &mut CallMetadata) {
        Self::clear(metadata);
        if let Some(value) = value {
            if !Self::is_empty(value) {
                Self::write(value, metadata);
            }
        }
    }
}

/// Marker for the caller identity kind.
#[derive(Debug, Clone, Copy)]
pub enum Identity {}

/// Marker for the tenant kind.
#[derive(Debug, Clone, Copy)]
pub enum Tenant {}

/// Marker for the correlation id kind.
#[derive(Debug, Clone, Copy)]
pub enum Correlation {}

impl ContextKind for Identity {
    type Value = IdentityContext;
    const NAME: &'static str = "identity";
    const KEYS: &'static [&'static str] = keys::IDENTITY;

    fn is_empty(value: &IdentityContext) -> bool {
        value.subject_id.is_empty()
    }

    fn write(value: &IdentityContext, metadata: &mut CallMetadata) {
        metadata.insert_non_empty(keys::IDENTITY_ID, &value.subject_id);
        metadata.insert_non_empty(keys::IDENTITY_EMAIL, &value.email);
        metadata.insert_non_empty(keys::IDENTITY_NAME, &value.display_name);
        metadata.insert_list(keys::IDENTITY_TENANTS, &value.tenants);
        metadata.insert_list(keys::IDENTITY_ROLES, &value.roles);
    }

    fn read(metadata: &CallMetadata) -> Result<Option<IdentityContext>, MetadataError> {
        let Some(subject_id) = metadata.get(keys::IDENTITY_ID) else {
            return Ok(None);
        };
        Ok(Some(IdentityContext {
            subject_id: subject_id.to_string(),
            email: metadata.get(keys::IDENTITY_EMAIL).unwrap_or_default().to_string(),
            display_name: metadata.get(keys::IDENTITY_NAME).unwrap_or_default().to_string(),
            tenants: metadata.get_list(keys::IDENTITY_TENANTS)?,
            roles: metadata.get_list(keys::IDENTITY_ROLES)?,
        }))
    }

    fn when_missing() -> Result<IdentityContext, NotResolved> {
        Err(NotResolved { kind: Self::NAME })
    }
}

impl ContextKind for Tenant {
    type Value = TenantContext;
    const NAME: &'static str = "tenant";
    const KEYS: &'static [&'static str] = keys::TENANT;

    fn is_empty(value: &TenantContext) -> bool {
        value.name.is_empty()
    }

    fn write(value: &TenantContext, metadata: &mut CallMetadata) {
        metadata.insert_non_empty(keys::TENANT_ID, &value.id);
        metadata.insert_non_empty(keys::TENANT_NAME, &value.name);
        metadata.insert_non_empty(keys::TENANT_STORAGE_ID, &value.storage_id);
    }

    fn read(metadata: &CallMetadata) -> Result<Option<TenantContext>, MetadataError> {
        Ok(metadata.get(keys::TENANT_NAME).map(|name| TenantContext {
            id: metadata.get(keys::TENANT_ID).unwrap_or_default().to_string(),
            name: name.to_string(),
            storage_id: metadata
                .get(keys::TENANT_STORAGE_ID)
                .unwrap_or_default()
                .to_string(),
        }))
    }

    fn when_missing() -> Result<TenantContext, NotResolved> {
        Err(NotResolved { kind: Self::NAME })
    }
}

impl ContextKind for Correlation {
    type Value = CorrelationId;
    const NAME: &'static str = "correlation";
    const KEYS: &'static [&'static str] = keys::CORRELATION;

    fn is_empty(value: &CorrelationId) -> bool {
        value.is_empty()
    }

    fn write(value: &CorrelationId, metadata: &mut CallMetadata) {
        metadata.insert_non_empty(keys::CORRELATION_ID, value.as_str());
    }

    fn read(metadata: &CallMetadata) -> Result<Option<CorrelationId>, MetadataError> {
        Ok(metadata.get(keys::CORRELATION_ID).map(CorrelationId::new))
    }

    /// Correlation is diagnostic only; absence resolves to the empty id.
    fn when_missing() -> Result<CorrelationId, NotResolved> {
        Ok(CorrelationId::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> IdentityContext {
        IdentityContext {
            subject_id: "u-1".to_string(),
            email: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
            tenants: vec!["t1".to_string(), "t2".to_string()],
            roles: vec!["admin".to_string()],
        }
    }

    #[test]
    fn identity_store_then_read_preserves_fields() {
        let mut md = CallMetadata::new();
        Identity::store(Some(&alice()), &mut md);
        assert_eq!(Identity::read(&md).unwrap(), Some(alice()));
    }

    #[test]
    fn store_replaces_optional_fields() {
        let mut md = CallMetadata::new();
        Identity::store(Some(&alice()), &mut md);
        Identity::store(Some(&IdentityContext::new("u-2")), &mut md);

        let read = Identity::read(&md).unwrap().unwrap();
        assert_eq!(read.subject_id, "u-2");
        assert!(read.email.is_empty());
        assert!(read.roles.is_empty());
        assert!(!md.contains_key(keys::IDENTITY_ROLES));
    }

    #[test]
    fn store_none_clears_only_own_keys() {
        let mut md = CallMetadata::new();
        Tenant::store(Some(&TenantContext::new("1", "t1", "shard-a")), &mut md);
        Correlation::store(Some(&CorrelationId::new("c-1")), &mut md);

        Tenant::store(None, &mut md);

        assert_eq!(Tenant::read(&md).unwrap(), None);
        assert_eq!(Correlation::read(&md).unwrap(), Some(CorrelationId::new("c-1")));
    }

    #[test]
    fn storing_an_empty_value_clears() {
        let mut md = CallMetadata::new();
        Tenant::store(Some(&TenantContext::named("t1")), &mut md);
        Tenant::store(Some(&TenantContext::default()), &mut md);
        assert!(md.is_empty());
    }

    #[test]
    fn tenant_requires_name() {
        let mut md = CallMetadata::new();
        md.insert(keys::TENANT_ID, "42");
        assert_eq!(Tenant::read(&md).unwrap(), None);
    }

    #[test]
    fn missing_policy_differs_per_kind() {
        assert_eq!(
            Identity::when_missing().unwrap_err(),
            NotResolved { kind: "identity" }
        );
        assert_eq!(Tenant::when_missing().unwrap_err().kind, "tenant");
        assert!(Correlation::when_missing().unwrap().is_empty());
    }

    #[test]
    fn identity_with_malformed_roles_is_an_error() {
        let mut md = CallMetadata::new();
        md.insert(keys::IDENTITY_ID, "u-1");
        md.insert(keys::IDENTITY_ROLES, "not json");
        assert!(Identity::read(&md).is_err());
    }

    #[test]
    fn tenant_serializes_camel_case() {
        let json = serde_json::to_value(TenantContext::new("1", "t1", "shard-a")).unwrap();
        assert_eq!(json["name"], "t1");
        assert_eq!(json["storageId"], "shard-a");
    }
}
