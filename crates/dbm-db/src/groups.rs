//! Group repository
//!
//! A `project == "projects/<id>"` filter term does not compile to a column
//! comparison. It becomes [`FindGroup::project_id`], which limits the list
//! to groups bound in that project's IAM policy.

use async_trait::async_trait;
use dbm_queries::schema::GroupSchema;
use dbm_queries::{args, Extracted, Query, SortOrder};
use serde::Serialize;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;
use crate::repository::{compile_predicate, ListQuery, ListRepository, Pagination, RepositoryResult};

/// Group database entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupRow {
    pub email: String,
    pub name: String,
    pub description: String,
    pub payload: serde_json::Value,
}

/// Search parameters for groups
#[derive(Debug, Clone, Default)]
pub struct FindGroup {
    pub email: Option<String>,
    /// Project resource id; set from a `project` filter term
    pub project_id: Option<String>,
    pub filter: String,
    pub order_by: String,
    pub pagination: Pagination,
}

impl FindGroup {
    /// Copy side-channel values produced by the filter
    pub fn apply_extracted(&mut self, extracted: &Extracted) {
        if let Some(project_id) = extracted.project() {
            self.project_id = Some(project_id.to_string());
        }
    }
}

/// Assemble the group list statement
pub fn build_group_query(find: &FindGroup) -> RepositoryResult<ListQuery> {
    let (predicate, extracted) = compile_predicate::<GroupSchema>(&find.filter)?;
    let order = SortOrder::parse_or_default::<GroupSchema>(&find.order_by)?;

    let mut find = find.clone();
    find.apply_extracted(&extracted);

    let mut query = Query::from_sql(
        "SELECT email, name, description, payload FROM user_group WHERE TRUE",
        args![],
    );
    if let Some(predicate) = predicate {
        query.and("?", args![predicate]);
    }
    if let Some(email) = &find.email {
        query.and("email = ?", args![email]);
    }
    if let Some(project_id) = &find.project_id {
        query.and(
            // Members are stored as "groups/<email>".
            "email IN (SELECT substring(member FROM 8) FROM policy, \
             jsonb_array_elements(policy.payload->'bindings') AS binding, \
             jsonb_array_elements_text(binding->'members') AS member \
             WHERE policy.resource_type = 'PROJECT' AND policy.type = 'IAM' \
             AND policy.resource = ? AND member LIKE 'groups/%')",
            args![format!("projects/{}", project_id)],
        );
    }

    Ok(ListQuery::new(query, &order, find.pagination))
}

/// Group repository implementation
pub struct GroupRepository {
    executor: QueryExecutor,
}

impl GroupRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ListRepository for GroupRepository {
    type Find = FindGroup;
    type Row = GroupRow;

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn build_query(&self, find: &FindGroup) -> RepositoryResult<ListQuery> {
        build_group_query(find)
    }
}
