//! Audit log repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dbm_queries::schema::AuditLogSchema;
use dbm_queries::{args, Query, SortOrder};
use serde::Serialize;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;
use crate::repository::{compile_predicate, ListQuery, ListRepository, Pagination, RepositoryResult};

/// Audit log database entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl AuditLogRow {
    fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    pub fn resource(&self) -> Option<&str> {
        self.payload_str("resource")
    }

    pub fn method(&self) -> Option<&str> {
        self.payload_str("method")
    }

    pub fn severity(&self) -> Option<&str> {
        self.payload_str("severity")
    }
}

/// Search parameters for audit logs
#[derive(Debug, Clone, Default)]
pub struct FindAuditLog {
    /// Restrict to logs under `projects/<id>`; `None` searches the workspace
    pub project_id: Option<String>,
    pub filter: String,
    pub order_by: String,
    pub pagination: Pagination,
}

/// Assemble the audit log list statement
pub fn build_audit_log_query(find: &FindAuditLog) -> RepositoryResult<ListQuery> {
    let (predicate, _) = compile_predicate::<AuditLogSchema>(&find.filter)?;
    let order = SortOrder::parse_or_default::<AuditLogSchema>(&find.order_by)?;

    let mut query = Query::from_sql("SELECT id, created_at, payload FROM audit_log WHERE TRUE", args![]);
    if let Some(project_id) = &find.project_id {
        query.and("payload->>'parent' = ?", args![format!("projects/{}", project_id)]);
    }
    if let Some(predicate) = predicate {
        query.and("?", args![predicate]);
    }

    Ok(ListQuery::new(query, &order, find.pagination))
}

/// Audit log repository implementation
pub struct AuditLogRepository {
    executor: QueryExecutor,
}

impl AuditLogRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ListRepository for AuditLogRepository {
    type Find = FindAuditLog;
    type Row = AuditLogRow;

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn build_query(&self, find: &FindAuditLog) -> RepositoryResult<ListQuery> {
        build_audit_log_query(find)
    }
}
