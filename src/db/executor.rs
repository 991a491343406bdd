//! Statement execution with timeouts.
//!
//! Every statement the engine issues goes through [`StatementExecutor`], which
//! binds record values, bounds the round trip with `tokio::time::timeout`, and
//! maps driver failures into [`DbError`].
//!
//! The helpers are generic over `sqlx::Executor`, so the same code runs against
//! a tenant pool (autocommit) or a connection borrowed from an open transaction.

use crate::db::params::bind_param;
use crate::error::{DbError, DbResult};
use crate::models::RecordValue;
use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;
use sqlx::postgres::PgRow;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// SQLSTATE raised when the server-side `statement_timeout` cancels a statement.
const QUERY_CANCELED: &str = "57014";

/// Runs statements under a fixed timeout.
#[derive(Debug, Clone, Copy)]
pub struct StatementExecutor {
    timeout: Duration,
    /// Reported when the pool gives up waiting for a connection
    acquire_timeout: Duration,
}

impl StatementExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Set the pool acquire timeout the tenant pools were built with.
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Start a transaction on a pooled connection.
    pub async fn begin(&self, pool: &PgPool) -> DbResult<Transaction<'static, Postgres>> {
        self.timed("begin transaction", pool.begin()).await
    }

    /// Run a parameterized statement and return every row.
    pub async fn fetch_all<'c, E>(
        &self,
        executor: E,
        sql: &str,
        params: &[RecordValue],
    ) -> DbResult<Vec<PgRow>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        debug!(sql = %sql, params = params.len(), "Fetching rows");
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        self.timed("query execution", query.fetch_all(executor)).await
    }

    /// Run a parameterized statement and return the first row, if any.
    pub async fn fetch_optional<'c, E>(
        &self,
        executor: E,
        sql: &str,
        params: &[RecordValue],
    ) -> DbResult<Option<PgRow>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        debug!(sql = %sql, params = params.len(), "Fetching single row");
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        self.timed("query execution", query.fetch_optional(executor))
            .await
    }

    /// Run a catalog query bound to text arguments (schema, table and column names).
    pub async fn fetch_catalog<'c, E>(
        &self,
        executor: E,
        sql: &str,
        args: &[&str],
    ) -> DbResult<Vec<PgRow>>
    where
        E: Executor<'c, Database = Postgres>,
    {
        debug!(sql = %sql, args = ?args, "Querying catalog");
        let mut query = sqlx::query(sql);
        for arg in args {
            query = query.bind(*arg);
        }
        self.timed("catalog lookup", query.fetch_all(executor)).await
    }

    /// Run a catalog check whose single column is a boolean, e.g. `SELECT EXISTS(..)`.
    pub async fn fetch_exists<'c, E>(&self, executor: E, sql: &str, args: &[&str]) -> DbResult<bool>
    where
        E: Executor<'c, Database = Postgres>,
    {
        debug!(sql = %sql, "Running catalog check");
        let mut query = sqlx::query_scalar::<_, bool>(sql);
        for arg in args {
            query = query.bind(*arg);
        }
        self.timed("catalog lookup", query.fetch_one(executor)).await
    }

    /// Run a statement without parameters (DDL), returning rows affected.
    pub async fn execute<'c, E>(&self, executor: E, sql: &str) -> DbResult<u64>
    where
        E: Executor<'c, Database = Postgres>,
    {
        debug!(sql = %sql, "Executing statement");
        let start = Instant::now();
        let result = self.timed("statement", executor.execute(sql)).await?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rows_affected = result.rows_affected(),
            "Statement complete"
        );
        Ok(result.rows_affected())
    }

    async fn timed<T, F>(&self, operation: &str, future: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(self.timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::PoolTimedOut)) => Err(DbError::timeout(
                "connection pool acquire",
                self.acquire_timeout.as_secs(),
            )),
            Ok(Err(e)) => {
                let err = DbError::from(e);
                if err.sql_state() == Some(QUERY_CANCELED) {
                    Err(self.timeout_error(operation))
                } else {
                    Err(err)
                }
            }
            Err(_) => Err(self.timeout_error(operation)),
        }
    }

    fn timeout_error(&self, operation: &str) -> DbError {
        DbError::timeout(operation, self.timeout.as_secs())
    }
}
