//! Output key ordering
//!
//! Keys are split into fields on a separator and compared field by field,
//! each with its own direction. The full key string breaks any remaining tie,
//! which keeps the ordering a strict total order even for keys that lack the
//! separator or carry extra separators.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order for one key field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Comparator over composite string keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOrdering {
    /// Separator between key fields; ignored for single-field orderings
    pub separator: char,
    /// Direction of each field, most significant first
    pub fields: Vec<SortOrder>,
}

impl KeyOrdering {
    /// Whole key, descending
    pub fn descending() -> Self {
        Self {
            separator: '\t',
            fields: vec![SortOrder::Descending],
        }
    }

    /// First field descending, second field ascending
    pub fn descending_then_ascending(separator: char) -> Self {
        Self {
            separator,
            fields: vec![SortOrder::Descending, SortOrder::Ascending],
        }
    }

    /// Parse a field direction list such as `"desc, asc"`
    pub fn parse(separator: char, spec: &str) -> Result<Self> {
        let mut fields = Vec::new();

        for field_spec in spec.split(',') {
            let field_spec = field_spec.trim();
            if field_spec.is_empty() {
                continue;
            }
            let order = match field_spec.to_uppercase().as_str() {
                "DESC" | "DESCENDING" => SortOrder::Descending,
                "ASC" | "ASCENDING" => SortOrder::Ascending,
                other => {
                    return Err(anyhow!(
                        "Invalid sort order: {}. Use ASC or DESC",
                        other
                    ))
                }
            };
            fields.push(order);
        }

        if fields.is_empty() {
            return Err(anyhow!("No sort fields specified"));
        }

        Ok(Self { separator, fields })
    }

    /// Compare two keys
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let n = self.fields.len();
        let mut a_parts = a.splitn(n, self.separator);
        let mut b_parts = b.splitn(n, self.separator);

        for order in &self.fields {
            // A missing field sorts before any present field, before direction is applied
            let ordering = order.apply(a_parts.next().cmp(&b_parts.next()));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        a.cmp(b)
    }

    /// Sort items in place by the key extracted from each
    pub fn sort_by_key<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> &str,
    {
        items.sort_by(|a, b| self.compare(key(a), key(b)));
    }
}
