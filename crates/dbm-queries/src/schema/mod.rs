//! Field Schema Registry
//!
//! One static table per searchable entity. Each entity is a zero-sized
//! marker implementing [`FilterSchema`] over a closed `Field` enum, and
//! `binding` is an exhaustive match, so adding a field without describing
//! how it compiles does not build.

use std::fmt;

use serde::Serialize;

use crate::sorts::SortDirection;

pub mod audit_log;
pub mod group;
pub mod instance;
pub mod plan;
pub mod project;

pub use audit_log::{AuditLogField, AuditLogSchema};
pub use group::{GroupField, GroupSchema};
pub use instance::{InstanceField, InstanceSchema};
pub use plan::{PlanField, PlanSchema};
pub use project::{ProjectField, ProjectSchema};

/// Operators a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operators {
    pub equals: bool,
    pub range: bool,
    pub matches: bool,
}

impl Operators {
    /// `==` only
    pub const EQUALS: Self = Self {
        equals: true,
        range: false,
        matches: false,
    };

    /// `==` and `.matches()`
    pub const EQUALS_MATCHES: Self = Self {
        equals: true,
        range: false,
        matches: true,
    };

    /// `>=` and `<=` only
    pub const RANGE: Self = Self {
        equals: false,
        range: true,
        matches: false,
    };
}

/// Out-of-band values a filter term can carry instead of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideChannel {
    /// Project resource id, e.g. from `project == "projects/p1"`
    Project,
    /// Creator email, e.g. from `creator == "users/a@b.com"`
    Creator,
}

impl SideChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Creator => "creator",
        }
    }
}

impl fmt::Display for SideChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a literal is validated and turned into SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// String equality, `<target> = ?`
    Text,
    /// Symbolic value mapped to its stored form, `(symbol, stored)`
    Enum(&'static [(&'static str, &'static str)]),
    /// Boolean stored as an optional JSON property; absent counts as false.
    ///
    /// TODO: drop the `IS NULL` branch once the property is backfilled and
    /// written for every row.
    OptionalFlag,
    /// `true` is `IS NOT NULL`, `false` is `IS NULL`
    Presence,
    /// `ACTIVE` / `DELETED` (optionally `STATE_` prefixed) against a bool column
    DeletedState,
    /// Symbolic value selecting which key must exist in an element of a JSON array
    Exists {
        array: &'static str,
        variants: &'static [(&'static str, &'static str)],
    },
    /// RFC3339 timestamp compared with `>=` / `<=`
    Timestamp,
    /// `true` emits `sql` with `arg` bound, `false` emits `TRUE`
    Toggle {
        sql: &'static str,
        arg: &'static str,
    },
    /// `"<prefix><id>"` compared as `<target> = <id>`
    ResourceName { prefix: &'static str },
    /// `"<prefix><id>"` returned out-of-band; the predicate is `TRUE`
    SideChannel {
        key: SideChannel,
        prefix: &'static str,
    },
    /// `<prefix><key>` compared against `<column>->'labels'->>key`
    Label {
        column: &'static str,
        prefix: &'static str,
    },
}

/// A filter variable's compilation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    /// Variable name as written in filters
    pub name: &'static str,
    /// Column or JSON projection in the caller's FROM clause
    pub target: &'static str,
    pub operators: Operators,
    pub rule: ValueRule,
}

/// A searchable entity's filter variables and sort keys
pub trait FilterSchema {
    type Field: Copy + Eq + fmt::Debug + 'static;

    /// Entity name used in diagnostics
    const ENTITY: &'static str;

    /// Every field, in declaration order
    const FIELDS: &'static [Self::Field];

    /// `(order_by key, column)` pairs
    const SORT_KEYS: &'static [(&'static str, &'static str)];

    /// Order applied when the caller gives none
    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)];

    fn binding(field: Self::Field) -> FieldBinding;

    /// Look up a filter variable by name
    fn resolve(name: &str) -> Option<Self::Field> {
        Self::FIELDS
            .iter()
            .copied()
            .find(|field| Self::binding(*field).name == name)
    }

    /// Name of the field range operators are allowed on, if any
    fn range_field() -> Option<&'static str> {
        Self::FIELDS
            .iter()
            .map(|field| Self::binding(*field))
            .find(|binding| binding.operators.range)
            .map(|binding| binding.name)
    }

    fn sort_column(key: &str) -> Option<&'static str> {
        Self::SORT_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, column)| *column)
    }
}
