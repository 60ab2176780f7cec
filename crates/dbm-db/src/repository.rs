//! Repository traits and base implementations
//!
//! Every searchable entity exposes the same list operation: compile the
//! caller's filter and `order_by`, embed them into the entity's SELECT and
//! run it read-only.

use async_trait::async_trait;
use dbm_core::{DbmError, QueryConfig};
use dbm_queries::{compile_filter, BuildError, Extracted, FilterError, FilterSchema, Query, SortOrder};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

use crate::query_executor::QueryExecutor;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Query build error: {0}")]
    Build(#[from] BuildError),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for DbmError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => DbmError::NotFound {
                entity: "resource",
                field: "name",
                value: what,
            },
            RepositoryError::Database(e) => DbmError::Database(e.to_string()),
            RepositoryError::Filter(e) => e.into(),
            RepositoryError::Build(e) => DbmError::Internal(e.to_string()),
        }
    }
}

/// Pagination parameters for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn page(page: i64, per_page: i64) -> Self {
        Self {
            limit: per_page,
            offset: (page - 1) * per_page,
        }
    }

    /// Bound the limit by the configured page sizes and the offset at zero
    pub fn clamped(self, config: &QueryConfig) -> Self {
        Self {
            limit: config.clamp_page_size(self.limit),
            offset: self.offset.max(0),
        }
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }

    pub fn page(&self) -> i64 {
        if self.limit == 0 {
            1
        } else {
            (self.offset / self.limit) + 1
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.limit == 0 {
            1
        } else {
            (self.total + self.limit - 1) / self.limit
        }
    }

    pub fn has_next(&self) -> bool {
        self.offset + self.limit < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }
}

/// A list statement and its matching count statement
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Page of rows, ordered and limited
    pub rows: Query,
    /// `COUNT(*)` over the same predicate
    pub count: Query,
    pub pagination: Pagination,
    ordered: Query,
}

impl ListQuery {
    /// Wrap an unordered SELECT with ordering, paging and a count statement
    pub fn new(base: Query, order: &SortOrder, pagination: Pagination) -> Self {
        let mut ordered = Query::from_sql("?", vec![base.clone().into()]);
        if !order.is_empty() {
            ordered.space(order.to_sql(), vec![]);
        }

        let mut rows = Query::from_sql("?", vec![ordered.clone().into()]);
        rows.space(
            "LIMIT ? OFFSET ?",
            vec![pagination.limit.into(), pagination.offset.into()],
        );

        let count = Query::from_sql("SELECT COUNT(*) FROM (?) AS matched", vec![base.into()]);

        Self {
            rows,
            count,
            pagination,
            ordered,
        }
    }

    /// Every matching row in order, without LIMIT/OFFSET
    pub fn unpaged(&self) -> Query {
        self.ordered.clone()
    }
}

/// Compile `filter` for entity `S`, logging rejected filters
pub fn compile_predicate<S: FilterSchema>(filter: &str) -> RepositoryResult<(Option<Query>, Extracted)> {
    match compile_filter::<S>(filter) {
        Ok(Some(compiled)) => {
            let (predicate, extracted) = compiled.into_parts();
            Ok((Some(predicate), extracted))
        }
        Ok(None) => Ok((None, Extracted::new())),
        Err(err) => {
            tracing::warn!(entity = S::ENTITY, filter, error = %err, "rejected filter");
            Err(err.into())
        }
    }
}

/// Base trait for entity list operations
#[async_trait]
pub trait ListRepository: Send + Sync {
    /// Search parameters, including any side-channel fields
    type Find: Send + Sync;

    /// Row type scanned from the list statement
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    fn executor(&self) -> &QueryExecutor;

    /// Assemble the list and count statements for `find`
    fn build_query(&self, find: &Self::Find) -> RepositoryResult<ListQuery>;

    /// Run a list query in one read-only transaction
    async fn list(&self, find: &Self::Find) -> RepositoryResult<PaginatedResult<Self::Row>> {
        let query = self.build_query(find)?;
        let (items, total) = self
            .executor()
            .fetch_page::<Self::Row>(&query.rows, &query.count)
            .await?;
        Ok(PaginatedResult::new(items, total, query.pagination))
    }
}
