//! Plan repository
//!
//! Plans are listed per project. `creator == "users/<email>"` in the filter
//! narrows the list to one creator through a principal lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dbm_queries::schema::PlanSchema;
use dbm_queries::{args, Extracted, Query, SortOrder};
use serde::Serialize;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;
use crate::repository::{
    compile_predicate, ListQuery, ListRepository, Pagination, RepositoryError, RepositoryResult,
};

const SELECT_PLAN: &str = "SELECT plan.id, plan.project, plan.creator_id, plan.created_at, \
     plan.updated_at, plan.name, plan.description, plan.config, plan.deleted, issue.id AS issue_id \
     FROM plan LEFT JOIN issue ON issue.plan_id = plan.id WHERE TRUE";

/// Plan database entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlanRow {
    pub id: i64,
    pub project: String,
    pub creator_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub description: String,
    pub config: serde_json::Value,
    pub deleted: bool,
    pub issue_id: Option<i32>,
}

impl PlanRow {
    pub fn has_issue(&self) -> bool {
        self.issue_id.is_some()
    }

    pub fn resource_name(&self) -> String {
        format!("projects/{}/plans/{}", self.project, self.id)
    }
}

/// Search parameters for plans
#[derive(Debug, Clone, Default)]
pub struct FindPlan {
    pub id: Option<i64>,
    pub project_id: Option<String>,
    /// Creator email; set from a `creator` filter term
    pub creator: Option<String>,
    pub filter: String,
    pub order_by: String,
    pub pagination: Pagination,
}

impl FindPlan {
    /// Copy side-channel values produced by the filter
    pub fn apply_extracted(&mut self, extracted: &Extracted) {
        if let Some(creator) = extracted.creator() {
            self.creator = Some(creator.to_string());
        }
    }
}

/// Assemble the plan list statement
pub fn build_plan_query(find: &FindPlan) -> RepositoryResult<ListQuery> {
    let (predicate, extracted) = compile_predicate::<PlanSchema>(&find.filter)?;
    let order = SortOrder::parse_or_default::<PlanSchema>(&find.order_by)?;

    let mut find = find.clone();
    find.apply_extracted(&extracted);

    let mut query = Query::from_sql(SELECT_PLAN, args![]);
    if let Some(predicate) = predicate {
        query.and("?", args![predicate]);
    }
    if let Some(id) = find.id {
        query.and("plan.id = ?", args![id]);
    }
    if let Some(project_id) = &find.project_id {
        query.and("plan.project = ?", args![project_id]);
    }
    if let Some(creator) = &find.creator {
        query.and(
            "plan.creator_id = (SELECT id FROM principal WHERE email = ?)",
            args![creator],
        );
    }

    Ok(ListQuery::new(query, &order, find.pagination))
}

/// Plan repository implementation
pub struct PlanRepository {
    executor: QueryExecutor,
}

impl PlanRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Get a single plan by id
    pub async fn get_plan(&self, project_id: &str, id: i64) -> RepositoryResult<PlanRow> {
        let find = FindPlan {
            id: Some(id),
            project_id: Some(project_id.to_string()),
            pagination: Pagination::new(1, 0),
            ..Default::default()
        };
        let query = build_plan_query(&find)?;
        self.executor
            .fetch_optional(&query.rows)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("projects/{}/plans/{}", project_id, id)))
    }
}

#[async_trait]
impl ListRepository for PlanRepository {
    type Find = FindPlan;
    type Row = PlanRow;

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn build_query(&self, find: &FindPlan) -> RepositoryResult<ListQuery> {
        build_plan_query(find)
    }
}
