//! Metadata filters for search and count.

use crate::document::{Metadata, MetadataValue, TAGS_KEY, TENANT_KEY};

/// A single condition on a metadata field.
///
/// Conditions on list-valued fields match when any element matches, the
/// way Qdrant keyword matching treats arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The field equals `value`.
    Equals {
        /// Metadata key.
        key: String,
        /// Expected value.
        value: String,
    },
    /// The field equals at least one of `values`.
    AnyOf {
        /// Metadata key.
        key: String,
        /// Accepted values.
        values: Vec<String>,
    },
}

impl Condition {
    /// The metadata key this condition inspects.
    pub fn key(&self) -> &str {
        match self {
            Self::Equals { key, .. } | Self::AnyOf { key, .. } => key,
        }
    }

    /// Whether `metadata` satisfies this condition.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let accepts = |candidate: &str| match self {
            Self::Equals { value, .. } => candidate == value,
            Self::AnyOf { values, .. } => values.iter().any(|v| v == candidate),
        };
        match metadata.get(self.key()) {
            Some(MetadataValue::Text(s)) => accepts(s.as_str()),
            Some(MetadataValue::List(items)) => items.iter().any(|item| accepts(item.as_str())),
            Some(MetadataValue::Integer(n)) => accepts(n.to_string().as_str()),
            None => false,
        }
    }
}

/// A conjunction of [`Condition`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Conditions that must all hold.
    pub must: Vec<Condition>,
}

impl Filter {
    /// Whether `metadata` satisfies every condition.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.must.iter().all(|condition| condition.matches(metadata))
    }
}

/// Build the tenant/tag filter for a search or count.
///
/// An empty tenant id or tag list adds no condition; with no conditions
/// the result is `None`, meaning an unrestricted search. The inputs are
/// copied, never modified.
pub fn build_filter(tenant_id: Option<&str>, tags: Option<&[String]>) -> Option<Filter> {
    let mut must = Vec::new();
    if let Some(tenant_id) = tenant_id.filter(|t| !t.is_empty()) {
        must.push(Condition::Equals { key: TENANT_KEY.to_string(), value: tenant_id.to_string() });
    }
    if let Some(tags) = tags.filter(|t| !t.is_empty()) {
        must.push(Condition::AnyOf { key: TAGS_KEY.to_string(), values: tags.to_vec() });
    }
    (!must.is_empty()).then_some(Filter { must })
}
