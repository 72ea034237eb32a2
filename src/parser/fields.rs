use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

/// One metadata row: platform nickname, display label, raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Item-level fields, optionally backed by the collection-level store.
///
/// Lookups consult the parent first; local fields are only used when the
/// parent has nothing for the query.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: IndexMap<String, Field>,
    parent: Option<Arc<FieldStore>>,
    pub collection_name: String,
}

impl FieldStore {
    pub fn new(
        fields: impl IntoIterator<Item = Field>,
        parent: Option<Arc<FieldStore>>,
        collection_name: impl Into<String>,
    ) -> Self {
        let mut by_key = IndexMap::new();
        for field in fields {
            // A repeated key keeps the slot of its first occurrence.
            by_key.insert(field.key.clone(), field);
        }
        Self {
            fields: by_key,
            parent,
            collection_name: collection_name.into(),
        }
    }

    pub fn parent(&self) -> Option<&FieldStore> {
        self.parent.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Value for an exact key: trimmed, one trailing `;` removed, empty when absent.
    pub fn query(&self, key: &str) -> String {
        if let Some(parent) = &self.parent {
            let inherited = parent.query(key);
            if !inherited.is_empty() {
                return inherited;
            }
        }
        self.fields
            .get(key)
            .map(|f| clean_value(&f.value))
            .unwrap_or_default()
    }

    /// Value of the first field whose label matches `pattern`.
    pub fn query_by_name(&self, pattern: &Regex) -> String {
        if let Some(parent) = &self.parent {
            let inherited = parent.query_by_name(pattern);
            if !inherited.is_empty() {
                return inherited;
            }
        }
        self.fields
            .values()
            .find(|f| pattern.is_match(&f.label))
            .map(|f| self.query(&f.key))
            .unwrap_or_default()
    }
}

fn clean_value(value: &str) -> String {
    let trimmed = value.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).to_string()
}

/// Collapse internal whitespace runs to one space and trim the ends.
pub fn trim_internal(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
