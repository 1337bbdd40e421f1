//! Call metadata: the string-keyed bag carried by every actor call.
//!
//! This is the wire contract shared by all call sites. Each context kind owns
//! a fixed set of keys (see [`keys`]) and is encoded into plain strings so the
//! bag stays readable by any runtime that speaks `MsgPack`. List-valued fields
//! are stored as JSON arrays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known metadata keys.
pub mod keys {
    pub const IDENTITY_ID: &str = "identity.id";
    pub const IDENTITY_EMAIL: &str = "identity.email";
    pub const IDENTITY_NAME: &str = "identity.name";
    pub const IDENTITY_TENANTS: &str = "identity.tenants";
    pub const IDENTITY_ROLES: &str = "identity.roles";

    pub const TENANT_ID: &str = "tenant.id";
    pub const TENANT_NAME: &str = "tenant.name";
    pub const TENANT_STORAGE_ID: &str = "tenant.storage_id";

    pub const CORRELATION_ID: &str = "correlation.id";

    /// All keys owned by the identity kind.
    pub const IDENTITY: &[&str] = &[
        IDENTITY_ID,
        IDENTITY_EMAIL,
        IDENTITY_NAME,
        IDENTITY_TENANTS,
        IDENTITY_ROLES,
    ];

    /// All keys owned by the tenant kind.
    pub const TENANT: &[&str] = &[TENANT_ID, TENANT_NAME, TENANT_STORAGE_ID];

    /// All keys owned by the correlation kind.
    pub const CORRELATION: &[&str] = &[CORRELATION_ID];
}

/// Errors from decoding a context value out of a metadata bag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata key {key} is not a valid JSON string list: {reason}")]
    MalformedList { key: &'static str, reason: String },
}

/// Ordered string map propagated with each call.
///
/// `BTreeMap` keeps serialization deterministic, which makes encoded
/// envelopes comparable in tests and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallMetadata {
    entries: BTreeMap<String, String>,
}

impl CallMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, treating an empty string as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Inserts `value` only when it is non-empty; otherwise removes `key`.
    pub fn insert_non_empty(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Removes every key in `keys`.
    pub fn remove_all(&mut self, keys: &[&str]) {
        for key in keys {
            self.entries.remove(*key);
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stores a string list as a JSON array. Empty lists remove the key.
    pub fn insert_list(&mut self, key: &str, values: &[String]) {
        if values.is_empty() {
            self.entries.remove(key);
            return;
        }
        // Serializing a slice of strings cannot fail.
        let encoded = serde_json::to_string(values).unwrap_or_default();
        self.entries.insert(key.to_string(), encoded);
    }

    /// Reads a JSON array of strings. A missing key yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::MalformedList` if the stored value is not a
    /// JSON array of strings.
    pub fn get_list(&self, key: &'static str) -> Result<Vec<String>, MetadataError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| MetadataError::MalformedList {
                key,
                reason: e.to_string(),
            }),
        }
    }
}

impl FromIterator<(String, String)> for CallMetadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_read_as_absent() {
        let mut md = CallMetadata::new();
        md.insert(keys::TENANT_NAME, "");
        assert!(md.get(keys::TENANT_NAME).is_none());
        assert!(md.contains_key(keys::TENANT_NAME));
    }

    #[test]
    fn insert_non_empty_removes_on_empty() {
        let mut md = CallMetadata::new();
        md.insert(keys::IDENTITY_EMAIL, "a@example.com");
        md.insert_non_empty(keys::IDENTITY_EMAIL, "");
        assert!(!md.contains_key(keys::IDENTITY_EMAIL));
    }

    #[test]
    fn list_values_are_json_arrays() {
        let mut md = CallMetadata::new();
        md.insert_list(keys::IDENTITY_ROLES, &["admin".to_string(), "reader".to_string()]);
        assert_eq!(md.get(keys::IDENTITY_ROLES), Some(r#"["admin","reader"]"#));
        assert_eq!(
            md.get_list(keys::IDENTITY_ROLES).unwrap(),
            vec!["admin".to_string(), "reader".to_string()]
        );
    }

    #[test]
    fn malformed_list_is_reported() {
        let mut md = CallMetadata::new();
        md.insert(keys::IDENTITY_ROLES, "admin,reader");
        let err = md.get_list(keys::IDENTITY_ROLES).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MalformedList { key: keys::IDENTITY_ROLES, .. }
        ));
    }

    #[test]
    fn serializes_as_flat_msgpack_map() {
        let mut md = CallMetadata::new();
        md.insert(keys::CORRELATION_ID, "c-1");
        md.insert(keys::TENANT_NAME, "t1");

        let bytes = rmp_serde::to_vec_named(&md).unwrap();
        let decoded: BTreeMap<String, String> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["tenant.name"], "t1");
    }
}
