//! Compiled filters
//!
//! The result of compiling a filter expression: a SQL predicate ready to be
//! embedded after `WHERE`, plus any values the filter carried out-of-band.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::builder::{BuildError, Query, SqlArg};
use crate::schema::SideChannel;

/// Side-channel values extracted while compiling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Extracted {
    values: BTreeMap<SideChannel, String>,
}

impl Extracted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; a later term for the same key replaces an earlier one
    pub fn insert(&mut self, key: SideChannel, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: SideChannel) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Project resource id from a `project == "projects/<id>"` term
    pub fn project(&self) -> Option<&str> {
        self.get(SideChannel::Project)
    }

    /// Creator email from a `creator == "users/<email>"` term
    pub fn creator(&self) -> Option<&str> {
        self.get(SideChannel::Creator)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SideChannel, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// A compiled, non-empty filter
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    /// The predicate, always wrapped in one outer parenthesis pair
    pub predicate: Query,
    pub extracted: Extracted,
}

impl CompiledFilter {
    /// Render the predicate with placeholders numbered from `$1`
    pub fn to_sql(&self) -> Result<(String, Vec<SqlArg>), BuildError> {
        self.predicate.to_sql()
    }

    /// Split into the predicate and the extracted values
    pub fn into_parts(self) -> (Query, Extracted) {
        (self.predicate, self.extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_extracted_last_write_wins() {
        let mut extracted = Extracted::new();
        assert!(extracted.is_empty());
        extracted.insert(SideChannel::Project, "p1");
        extracted.insert(SideChannel::Project, "p2");
        assert_eq!(extracted.project(), Some("p2"));
        assert_eq!(extracted.creator(), None);
        assert_eq!(extracted.iter().count(), 1);
    }

    #[test]
    fn test_extracted_serializes_as_map() {
        let mut extracted = Extracted::new();
        extracted.insert(SideChannel::Creator, "a@example.com");
        extracted.insert(SideChannel::Project, "p1");
        assert_eq!(
            serde_json::to_string(&extracted).unwrap(),
            r#"{"project":"p1","creator":"a@example.com"}"#
        );
    }

    #[test]
    fn test_compiled_filter_renders_predicate() {
        let compiled = CompiledFilter {
            predicate: Query::from_sql("(name = ?)", args!["x"]),
            extracted: Extracted::new(),
        };
        let (sql, args) = compiled.to_sql().unwrap();
        assert_eq!(sql, "(name = $1)");
        assert_eq!(args, vec![SqlArg::from("x")]);
    }
}
