//! Query execution engine.
//!
//! This module runs generated SQL with:
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Query timeouts
//! - An optional read-only guard
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`, `postgres`, `sqlite`: raw statement fetch for each pool type
//!
//! Statements are sent unprepared: generated SQL has no bind parameters and
//! some read statements (SHOW, EXPLAIN) are not preparable everywhere.
//!
//! Database failures never escape as errors. They come back as a failed
//! [`QueryResult`] so the caller can branch on `success`.

use crate::db::guard::validate_readonly;
use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{AgentError, AgentResult};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, DatabaseType, MAX_ROW_LIMIT, QueryResult,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Prefix of every execution failure message.
pub const EXECUTION_ERROR_PREFIX: &str = "SQL execution error:";

/// Something that can run a SQL string and report the outcome.
///
/// Implementations must not fail: database problems are reported through
/// `QueryResult::success`.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, sql: &str) -> QueryResult;
}

/// Query executor bound to the session's pool.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: DbPool,
    timeout: Duration,
    row_limit: u32,
    enforce_readonly: bool,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            row_limit: DEFAULT_ROW_LIMIT,
            enforce_readonly: false,
        }
    }

    /// Set the per-statement timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// Set the row cap, clamped to [1, MAX_ROW_LIMIT].
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit.clamp(1, MAX_ROW_LIMIT);
        self
    }

    /// Reject anything but read-only statements before execution.
    pub fn with_enforce_readonly(mut self, enforce: bool) -> Self {
        self.enforce_readonly = enforce;
        self
    }

    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    /// Execute a statement and return its rows.
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let start = Instant::now();

        debug!(
            sql = %sql,
            limit = self.row_limit,
            timeout_secs = self.timeout.as_secs(),
            "Executing query"
        );

        let outcome = match self.check_allowed(sql) {
            Ok(()) => self.fetch(sql, start).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(sql = %sql, error = %e, "Query failed");
                QueryResult::failure(sql, format!("{} {}", EXECUTION_ERROR_PREFIX, e))
                    .with_execution_time(start.elapsed().as_millis() as u64)
            }
        }
    }

    fn check_allowed(&self, sql: &str) -> AgentResult<()> {
        if self.enforce_readonly {
            validate_readonly(sql, self.pool.db_type())?;
        }
        Ok(())
    }

    async fn fetch(&self, sql: &str, start: Instant) -> AgentResult<QueryResult> {
        match &self.pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, self.row_limit, self.timeout).await?;
                Ok(process_rows(sql, rows, self.row_limit, start))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, self.row_limit, self.timeout).await?;
                Ok(process_rows(sql, rows, self.row_limit, start))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, self.row_limit, self.timeout).await?;
                Ok(process_rows(sql, rows, self.row_limit, start))
            }
        }
    }
}

#[async_trait]
impl QueryRunner for QueryExecutor {
    async fn run(&self, sql: &str) -> QueryResult {
        self.execute(sql).await
    }
}

/// Process rows from any database type into a QueryResult.
fn process_rows<R: RowToJson>(
    sql: &str,
    rows: Vec<R>,
    row_limit: u32,
    start: Instant,
) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let json_rows = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    debug!(
        rows = total_rows.min(row_limit as usize),
        execution_time_ms, "Query completed"
    );

    QueryResult::success(sql, json_rows)
        .with_truncated(truncated)
        .with_execution_time(execution_time_ms)
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> AgentResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(AgentError::from)?);
    }
    Ok(rows)
}

fn timeout_error(operation: &str, timeout: Duration) -> AgentError {
    AgentError::timeout(operation, timeout.as_secs() as u32)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its pool type.

mod mysql {
    use super::*;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AgentResult<Vec<MySqlRow>> {
        use sqlx::Executor;
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AgentResult<Vec<PgRow>> {
        use sqlx::Executor;
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AgentResult<Vec<SqliteRow>> {
        use sqlx::Executor;
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_executor() -> QueryExecutor {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        QueryExecutor::new(DbPool::SQLite(pool))
    }

    #[tokio::test]
    async fn test_executor_defaults() {
        let executor = memory_executor().await;
        assert_eq!(
            executor.timeout,
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
        assert_eq!(executor.row_limit(), DEFAULT_ROW_LIMIT);
        assert!(!executor.enforce_readonly);
    }

    #[tokio::test]
    async fn test_executor_limit_clamped() {
        let executor = memory_executor().await.with_row_limit(999_999);
        assert_eq!(executor.row_limit(), MAX_ROW_LIMIT);
        let executor = executor.with_row_limit(0);
        assert_eq!(executor.row_limit(), 1);
    }

    #[tokio::test]
    async fn test_expression_columns_keep_order() {
        let executor = memory_executor().await;
        let result = executor.execute("SELECT 42 AS count, 'x' AS label").await;
        assert!(result.success);
        assert_eq!(result.column_names, vec!["count", "label"]);
        assert_eq!(result.data[0]["count"], serde_json::json!(42));
        assert_eq!(result.data[0]["label"], serde_json::json!("x"));
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let executor = memory_executor().await;
        let result = executor.execute("SELECT * FROM custmers").await;
        assert!(!result.success);
        assert_eq!(result.sql_query, "SELECT * FROM custmers");
        let message = result.error_message.unwrap();
        assert!(message.starts_with(EXECUTION_ERROR_PREFIX));
        assert!(message.contains("custmers"));
    }

    #[tokio::test]
    async fn test_truncation_at_row_limit() {
        let executor = memory_executor().await.with_row_limit(2);
        let result = executor
            .execute("SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3")
            .await;
        assert!(result.success);
        assert_eq!(result.row_count(), 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_readonly_guard_blocks_before_execution() {
        let executor = memory_executor().await.with_enforce_readonly(true);
        let result = executor.execute("CREATE TABLE t (id INTEGER)").await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("Permission denied"));

        // Table was never created
        let check = executor.execute("SELECT * FROM t").await;
        assert!(!check.success);
    }
}
