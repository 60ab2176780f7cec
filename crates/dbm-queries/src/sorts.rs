//! Sort Orders
//!
//! Parses the `order_by` parameter of list endpoints: a comma separated list
//! of `<key> [asc|desc]` items. Keys are resolved through the entity's
//! [`FilterSchema`] so only known columns ever reach the SQL text.

use serde::Serialize;

use crate::error::{FilterError, FilterResult};
use crate::schema::FilterSchema;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortCriterion {
    /// The key as given in `order_by`
    pub key: String,
    /// Column the key resolves to
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    /// Create a new empty sort order
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `order_by` string for entity `S`.
    ///
    /// An empty or blank string yields an empty order.
    pub fn parse<S: FilterSchema>(order_by: &str) -> FilterResult<Self> {
        let mut order = Self::new();
        if order_by.trim().is_empty() {
            return Ok(order);
        }

        for item in order_by.split(',') {
            let mut tokens = item.split_whitespace();
            let key = tokens
                .next()
                .ok_or_else(|| FilterError::InvalidOrderBy(order_by.to_string()))?;
            let direction = match tokens.next() {
                None => SortDirection::Asc,
                Some(word) => SortDirection::from_keyword(word)
                    .ok_or_else(|| FilterError::InvalidOrderBy(order_by.to_string()))?,
            };
            if tokens.next().is_some() {
                return Err(FilterError::InvalidOrderBy(order_by.to_string()));
            }

            let column = S::sort_column(key)
                .ok_or_else(|| FilterError::UnsupportedOrderBy(key.to_string()))?;
            order.criteria.push(SortCriterion {
                key: key.to_string(),
                column,
                direction,
            });
        }
        Ok(order)
    }

    /// The entity's default order
    pub fn default_for<S: FilterSchema>() -> Self {
        let criteria = S::DEFAULT_ORDER
            .iter()
            .filter_map(|(key, direction)| {
                S::sort_column(key).map(|column| SortCriterion {
                    key: key.to_string(),
                    column,
                    direction: *direction,
                })
            })
            .collect();
        Self { criteria }
    }

    /// Parse `order_by`, falling back to the entity's default when empty
    pub fn parse_or_default<S: FilterSchema>(order_by: &str) -> FilterResult<Self> {
        let order = Self::parse::<S>(order_by)?;
        if order.is_empty() {
            Ok(Self::default_for::<S>())
        } else {
            Ok(order)
        }
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Check if any sort is defined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Render as an `ORDER BY` clause, or an empty string
    pub fn to_sql(&self) -> String {
        if self.criteria.is_empty() {
            return String::new();
        }
        let items: Vec<String> = self
            .criteria
            .iter()
            .map(|c| format!("{} {}", c.column, c.direction.as_sql()))
            .collect();
        format!("ORDER BY {}", items.join(", "))
    }
}
