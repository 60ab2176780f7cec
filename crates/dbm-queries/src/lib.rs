//! # dbm-queries
//!
//! Filter expressions for the DBM list endpoints.
//!
//! A filter such as `title.matches("etl") && state == ACTIVE` is parsed,
//! checked against a per-entity field table and compiled into a
//! parameterized SQL predicate. User supplied values never reach the SQL
//! text; they are returned as positional arguments.
//!
//! ## Structure
//!
//! - `builder` - Composable SQL fragments with positional arguments
//! - `filters` - Filter expression syntax tree
//! - `parser` - Filter grammar
//! - `schema` - Per-entity field tables
//! - `compiler` - Syntax tree to SQL predicate
//! - `query` - Compiled filters and extracted side-channel values
//! - `sorts` - `order_by` parsing
//!
//! ## Example
//!
//! ```
//! use dbm_queries::builder::SqlArg;
//! use dbm_queries::compile_filter;
//! use dbm_queries::schema::AuditLogSchema;
//!
//! let compiled = compile_filter::<AuditLogSchema>(r#"resource == "projects/test-project""#)
//!     .unwrap()
//!     .unwrap();
//! let (sql, args) = compiled.to_sql().unwrap();
//! assert_eq!(sql, "(payload->>'resource' = $1)");
//! assert_eq!(args, vec![SqlArg::from("projects/test-project")]);
//!
//! // The empty filter means "no WHERE clause"
//! assert!(compile_filter::<AuditLogSchema>("").unwrap().is_none());
//! ```

pub mod builder;
pub mod compiler;
pub mod error;
pub mod filters;
pub mod parser;
pub mod query;
pub mod schema;
pub mod sorts;

// Re-exports for convenience
pub use builder::{BuildError, Query, QueryArg, SqlArg};
pub use compiler::{compile_expr, compile_filter};
pub use error::{FilterError, FilterResult};
pub use filters::{ComparisonOperator, FilterExpr, Literal, Method};
pub use parser::{parse_filter, MAX_NESTING, MAX_TERMS};
pub use query::{CompiledFilter, Extracted};
pub use schema::{FieldBinding, FilterSchema, SideChannel, ValueRule};
pub use sorts::{SortCriterion, SortDirection, SortOrder};
