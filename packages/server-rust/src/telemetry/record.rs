use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Span,
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// A finished span or log record on its way to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    pub kind: RecordKind,
    pub name: String,
    pub target: String,
    pub level: String,
    /// Fields recorded by the instrumented code.
    pub fields: BTreeMap<String, String>,
    /// Tags attached by enrichers.
    pub tags: Vec<Tag>,
}

impl TelemetryRecord {
    #[must_use]
    pub fn new(kind: RecordKind, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            target: target.into(),
            level: "INFO".to_string(),
            fields: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    /// Sets `key`, removing every earlier tag under the same key.
    pub fn upsert_tag(&mut self, key: &str, value: impl Into<String>) {
        self.tags.retain(|t| t.key != key);
        self.tags.push(Tag {
            key: key.to_string(),
            value: value.into(),
        });
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_instead_of_duplicating() {
        let mut record = TelemetryRecord::new(RecordKind::Span, "s", "t");
        record.upsert_tag("tenant.name", "t1");
        record.upsert_tag("other", "x");
        record.upsert_tag("tenant.name", "t2");

        assert_eq!(record.tags.len(), 2);
        assert_eq!(record.tag("tenant.name"), Some("t2"));
    }
}
