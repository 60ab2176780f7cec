//! Instance repository
//!
//! Instance filters can reach into data sources (`host`, `port`) and the
//! databases an instance hosts (`project`). Those joins fan out, so the
//! filter runs in a sub-select over instance ids and the outer statement
//! returns each instance once.

use async_trait::async_trait;
use dbm_queries::schema::InstanceSchema;
use dbm_queries::{args, Query, SortOrder};
use serde::Serialize;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;
use crate::repository::{
    compile_predicate, ListQuery, ListRepository, Pagination, RepositoryError, RepositoryResult,
};

/// Instance database entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstanceRow {
    pub resource_id: String,
    pub environment: Option<String>,
    pub deleted: bool,
    pub metadata: serde_json::Value,
}

impl InstanceRow {
    pub fn resource_name(&self) -> String {
        format!("instances/{}", self.resource_id)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }

    pub fn engine(&self) -> Option<&str> {
        self.metadata.get("engine").and_then(|v| v.as_str())
    }
}

/// Search parameters for instances
#[derive(Debug, Clone, Default)]
pub struct FindInstance {
    pub resource_id: Option<String>,
    /// Only instances hosting a database in this project
    pub project_id: Option<String>,
    pub show_deleted: bool,
    pub filter: String,
    pub order_by: String,
    pub pagination: Pagination,
}

/// Assemble the instance list statement
pub fn build_instance_query(find: &FindInstance) -> RepositoryResult<ListQuery> {
    let (predicate, _) = compile_predicate::<InstanceSchema>(&find.filter)?;
    let order = SortOrder::parse_or_default::<InstanceSchema>(&find.order_by)?;

    let mut query = Query::from_sql(
        "SELECT instance.resource_id, instance.environment, instance.deleted, instance.metadata \
         FROM instance WHERE TRUE",
        args![],
    );
    let mut scope = Query::new();
    if let Some(predicate) = predicate {
        scope.and("?", args![predicate]);
    }
    if let Some(project_id) = &find.project_id {
        scope.and("db.project = ?", args![project_id]);
    }
    if !scope.is_empty() {
        query.and(
            "instance.resource_id IN (SELECT instance.resource_id FROM instance \
             LEFT JOIN LATERAL jsonb_array_elements(instance.metadata->'dataSources') AS ds ON TRUE \
             LEFT JOIN db ON db.instance = instance.resource_id \
             WHERE ?)",
            args![scope],
        );
    }
    if let Some(resource_id) = &find.resource_id {
        query.and("instance.resource_id = ?", args![resource_id]);
    }
    if !find.show_deleted {
        query.and("instance.deleted = ?", args![false]);
    }

    Ok(ListQuery::new(query, &order, find.pagination))
}

/// Instance repository implementation
pub struct InstanceRepository {
    executor: QueryExecutor,
}

impl InstanceRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Get an instance by resource id, including deleted ones
    pub async fn get_instance(&self, resource_id: &str) -> RepositoryResult<InstanceRow> {
        let find = FindInstance {
            resource_id: Some(resource_id.to_string()),
            show_deleted: true,
            pagination: Pagination::new(1, 0),
            ..Default::default()
        };
        let query = build_instance_query(&find)?;
        self.executor
            .fetch_optional(&query.rows)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("instances/{}", resource_id)))
    }

    /// Every active instance hosting a database in `project_id`, unpaged
    pub async fn list_for_project(&self, project_id: &str) -> RepositoryResult<Vec<InstanceRow>> {
        let find = FindInstance {
            project_id: Some(project_id.to_string()),
            ..Default::default()
        };
        let query = build_instance_query(&find)?;
        self.executor.fetch_all(&query.unpaged()).await
    }
}

#[async_trait]
impl ListRepository for InstanceRepository {
    type Find = FindInstance;
    type Row = InstanceRow;

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn build_query(&self, find: &FindInstance) -> RepositoryResult<ListQuery> {
        build_instance_query(find)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbm_queries::SqlArg;

    #[test]
    fn test_build_without_filter() {
        let (sql, _) = build_instance_query(&FindInstance::default())
            .unwrap()
            .rows
            .to_sql()
            .unwrap();
        assert!(!sql.contains("LATERAL"));
        assert!(sql.ends_with(
            "WHERE TRUE AND instance.deleted = $1 ORDER BY instance.resource_id ASC LIMIT $2 OFFSET $3"
        ));
    }

    #[test]
    fn test_filter_runs_in_sub_select() {
        let find = FindInstance {
            filter: r#"host == "10.0.0.1" && (engine == MYSQL || engine == POSTGRES)"#.to_string(),
            order_by: "title desc".to_string(),
            ..Default::default()
        };
        let (sql, args) = build_instance_query(&find).unwrap().rows.to_sql().unwrap();
        assert!(sql.contains(
            "LEFT JOIN db ON db.instance = instance.resource_id \
             WHERE ((ds->>'host' = $1 AND (instance.metadata->>'engine' = $2 OR instance.metadata->>'engine' = $3)))) \
             AND instance.deleted = $4 ORDER BY instance.metadata->>'title' DESC"
        ), "{}", sql);
        assert_eq!(
            args[..4],
            [
                SqlArg::from("10.0.0.1"),
                SqlArg::from("MYSQL"),
                SqlArg::from("POSTGRES"),
                SqlArg::Bool(false)
            ]
        );
    }

    #[test]
    fn test_project_filter() {
        let find = FindInstance {
            filter: r#"project == "projects/p1""#.to_string(),
            ..Default::default()
        };
        let (sql, args) = build_instance_query(&find).unwrap().count.to_sql().unwrap();
        assert!(sql.contains("WHERE (db.project = $1))"), "{}", sql);
        assert_eq!(args[0], SqlArg::from("p1"));
    }

    #[test]
    fn test_project_scope_joins_filter() {
        let find = FindInstance {
            project_id: Some(r"p1\".to_string()),
            filter: "engine == MYSQL".to_string(),
            ..Default::default()
        };
        let (sql, args) = build_instance_query(&find).unwrap().rows.to_sql().unwrap();
        assert!(
            sql.contains("WHERE (instance.metadata->>'engine' = $1) AND db.project = $2) AND instance.deleted = $3"),
            "{}",
            sql
        );
        assert_eq!(
            args[..3],
            [SqlArg::from("MYSQL"), SqlArg::from(r"p1\"), SqlArg::Bool(false)]
        );
    }

    #[test]
    fn test_project_scope_without_filter() {
        let find = FindInstance {
            project_id: Some("p1".to_string()),
            show_deleted: true,
            ..Default::default()
        };
        let query = build_instance_query(&find).unwrap();
        let (sql, args) = query.unpaged().to_sql().unwrap();
        assert!(
            sql.ends_with("WHERE db.project = $1) ORDER BY instance.resource_id ASC"),
            "{}",
            sql
        );
        assert_eq!(args, vec![SqlArg::from("p1")]);
    }

    #[test]
    fn test_metadata_accessors() {
        let row = InstanceRow {
            resource_id: "prod-pg".to_string(),
            environment: Some("prod".to_string()),
            deleted: false,
            metadata: serde_json::json!({"title": "Prod PG", "engine": "POSTGRES"}),
        };
        assert_eq!(row.resource_name(), "instances/prod-pg");
        assert_eq!(row.title(), Some("Prod PG"));
        assert_eq!(row.engine(), Some("POSTGRES"));
    }
}
