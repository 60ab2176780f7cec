//! Database connection pool management
//!
//! Provides PostgreSQL connection pooling using SQLx.

use std::time::Duration;

use dbm_core::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::query_executor::QueryExecutor;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    statement_timeout: Duration,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(config).connect(&config.url).await?;

        tracing::info!(
            "Database pool created with {} max connections",
            config.pool_size
        );

        Ok(Self {
            pool,
            statement_timeout: Duration::from_secs(config.statement_timeout_seconds),
        })
    }

    /// Create a pool that opens connections on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(config).connect_lazy(&config.url)?;
        Ok(Self {
            pool,
            statement_timeout: Duration::from_secs(config.statement_timeout_seconds),
        })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Executor bound to this pool with the configured statement timeout
    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.pool.clone()).with_statement_timeout(self.statement_timeout)
    }

    /// Check if the database is reachable
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}
