//! Project repository
//!
//! Database operations for projects.

use async_trait::async_trait;
use dbm_queries::schema::ProjectSchema;
use dbm_queries::{args, Query, SortOrder};
use serde::Serialize;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;
use crate::repository::{
    compile_predicate, ListQuery, ListRepository, Pagination, RepositoryError, RepositoryResult,
};

/// Project database entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectRow {
    pub resource_id: String,
    pub name: String,
    pub data_classification_config_id: String,
    pub setting: serde_json::Value,
    pub deleted: bool,
}

impl ProjectRow {
    pub fn resource_name(&self) -> String {
        format!("projects/{}", self.resource_id)
    }

    /// Label value from the project setting
    pub fn label(&self, key: &str) -> Option<&str> {
        self.setting
            .get("labels")
            .and_then(|labels| labels.get(key))
            .and_then(|v| v.as_str())
    }
}

/// Search parameters for projects
#[derive(Debug, Clone, Default)]
pub struct FindProject {
    pub resource_id: Option<String>,
    pub show_deleted: bool,
    pub filter: String,
    pub order_by: String,
    pub pagination: Pagination,
}

/// Assemble the project list statement
pub fn build_project_query(find: &FindProject) -> RepositoryResult<ListQuery> {
    let (predicate, _) = compile_predicate::<ProjectSchema>(&find.filter)?;
    let order = SortOrder::parse_or_default::<ProjectSchema>(&find.order_by)?;

    let mut query = Query::from_sql(
        "SELECT resource_id, name, data_classification_config_id, setting, deleted FROM project WHERE TRUE",
        args![],
    );
    if let Some(predicate) = predicate {
        query.and("?", args![predicate]);
    }
    if let Some(resource_id) = &find.resource_id {
        query.and("resource_id = ?", args![resource_id]);
    }
    if !find.show_deleted {
        query.and("deleted = ?", args![false]);
    }

    Ok(ListQuery::new(query, &order, find.pagination))
}

/// Project repository implementation
pub struct ProjectRepository {
    executor: QueryExecutor,
}

impl ProjectRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Get a project by resource id, including deleted ones
    pub async fn get_project(&self, resource_id: &str) -> RepositoryResult<ProjectRow> {
        let find = FindProject {
            resource_id: Some(resource_id.to_string()),
            show_deleted: true,
            pagination: Pagination::new(1, 0),
            ..Default::default()
        };
        let query = build_project_query(&find)?;
        self.executor
            .fetch_optional(&query.rows)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("projects/{}", resource_id)))
    }
}

#[async_trait]
impl ListRepository for ProjectRepository {
    type Find = FindProject;
    type Row = ProjectRow;

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn build_query(&self, find: &FindProject) -> RepositoryResult<ListQuery> {
        build_project_query(find)
    }
}
