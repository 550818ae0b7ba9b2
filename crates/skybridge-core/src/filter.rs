//! Store query primitives
//!
//! The store collaborator accepts a small filter language: field equality,
//! membership over a bounded id set, and equality against a path inside the
//! vendor extension payload. Enough for every query the engine issues;
//! anything richer belongs to the store implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on one page of store results, and on the id set accepted by
/// a single resolve or reconcile call.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `field == value`
    Eq { field: String, value: Value },

    /// `field IN (values)`
    In { field: String, values: Vec<String> },

    /// Equality against a dotted path into the extension payload,
    /// e.g. `extension.self_link IN (values)`.
    JsonIn { field: String, values: Vec<String> },

    /// Conjunction.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, values: &[String]) -> Self {
        Filter::In {
            field: field.into(),
            values: values.to_vec(),
        }
    }

    pub fn json_in(field: impl Into<String>, values: &[String]) -> Self {
        Filter::JsonIn {
            field: field.into(),
            values: values.to_vec(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluate the filter against one record.
    pub fn matches<S: FieldSource>(&self, source: &S) -> bool {
        match self {
            Filter::Eq { field, value } => source.field_value(field).as_ref() == Some(value),
            Filter::In { field, values } | Filter::JsonIn { field, values } => source
                .field_value(field)
                .and_then(|v| v.as_str().map(str::to_string))
                .is_some_and(|v| values.contains(&v)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(source)),
        }
    }
}

/// Anything a [`Filter`] can be evaluated against.
///
/// Dotted fields (`extension.self_link`) resolve into the extension
/// payload.
pub trait FieldSource {
    fn field_value(&self, field: &str) -> Option<Value>;
}

/// One page of store results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub start: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(start: u32, limit: u32) -> Self {
        Self { start, limit }
    }

    /// First page holding at most `limit` entries.
    pub fn first(limit: u32) -> Self {
        Self { start: 0, limit }
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + self.limit,
            limit: self.limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            start: 0,
            limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Row(serde_json::Map<String, Value>);

    impl FieldSource for Row {
        fn field_value(&self, field: &str) -> Option<Value> {
            self.0.get(field).cloned()
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        Row(pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect())
    }

    #[test]
    fn eq_and_in_compose() {
        let record = row(&[
            ("vendor", json!("tcloud")),
            ("cloud_id", json!("vpc-aaa")),
        ]);

        let filter = Filter::and(vec![
            Filter::eq("vendor", "tcloud"),
            Filter::contains("cloud_id", &["vpc-aaa".to_string(), "vpc-bbb".to_string()]),
        ]);
        assert!(filter.matches(&record));

        let filter = Filter::and(vec![
            Filter::eq("vendor", "aws"),
            Filter::contains("cloud_id", &["vpc-aaa".to_string()]),
        ]);
        assert!(!filter.matches(&record));
    }

    #[test]
    fn missing_field_never_matches() {
        let record = row(&[("vendor", json!("gcp"))]);
        assert!(!Filter::contains("cloud_id", &["vpc-aaa".to_string()]).matches(&record));
    }

    #[test]
    fn page_advances_by_limit() {
        let page = Page::first(100);
        assert_eq!(page.next(), Page::new(100, 100));
    }
}
