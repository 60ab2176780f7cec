//! # dbm-db
//!
//! Database layer for filtered list queries.
//!
//! This crate runs statements assembled from compiled filter expressions
//! against PostgreSQL using SQLx, including:
//!
//! - Connection pool management
//! - Read-only list execution with a matching row count
//! - Per-entity repositories for audit logs, groups, plans, projects and instances
//!
//! ## Example
//!
//! ```ignore
//! use dbm_db::{Database, FindPlan, ListRepository, PlanRepository};
//!
//! let db = Database::connect(&config.database).await?;
//! let repo = PlanRepository::new(db.executor());
//! let page = repo
//!     .list(&FindPlan {
//!         project_id: Some("p1".into()),
//!         filter: r#"has_issue == true && title.matches("migration")"#.into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

pub mod pool;
pub mod query_executor;
pub mod repository;

pub mod audit_logs;
pub mod groups;
pub mod instances;
pub mod plans;
pub mod projects;

// Re-exports
pub use pool::{Database, PoolStats};
pub use query_executor::QueryExecutor;
pub use repository::{
    compile_predicate, ListQuery, ListRepository, Pagination, PaginatedResult, RepositoryError,
    RepositoryResult,
};

pub use audit_logs::{build_audit_log_query, AuditLogRepository, AuditLogRow, FindAuditLog};
pub use groups::{build_group_query, FindGroup, GroupRepository, GroupRow};
pub use instances::{build_instance_query, FindInstance, InstanceRepository, InstanceRow};
pub use plans::{build_plan_query, FindPlan, PlanRepository, PlanRow};
pub use projects::{build_project_query, FindProject, ProjectRepository, ProjectRow};
