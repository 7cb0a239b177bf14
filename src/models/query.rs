//! Query-related data models.
//!
//! This module defines the outcome of a single SQL execution attempt and the
//! summary of it that is handed to the completion service.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default cap on rows kept from a single execution.
pub const DEFAULT_ROW_LIMIT: u32 = 10000;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 100000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Rows included in the data summary sent for answer synthesis.
pub const SUMMARY_SAMPLE_ROWS: usize = 10;

/// One result row: column name to value, in column order.
pub type Row = serde_json::Map<String, JsonValue>;

/// Outcome of executing one SQL statement.
///
/// A failed execution is still a `QueryResult` (with `success == false`);
/// the executor never hands back an error for database-side problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub sql_query: String,
    pub data: Vec<Row>,
    pub column_names: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// True if rows beyond the executor's row limit were dropped
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a successful result. Column names come from the first row.
    pub fn success(sql_query: impl Into<String>, data: Vec<Row>) -> Self {
        let column_names = data
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            sql_query: sql_query.into(),
            data,
            column_names,
            success: true,
            error_message: None,
            truncated: false,
            execution_time_ms: 0,
        }
    }

    /// Create a failed result carrying a human-readable message.
    pub fn failure(sql_query: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            sql_query: sql_query.into(),
            data: Vec::new(),
            column_names: Vec::new(),
            success: false,
            error_message: Some(error_message.into()),
            truncated: false,
            execution_time_ms: 0,
        }
    }

    /// Mark the result as truncated by the row limit.
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// Record how long the execution took.
    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Compact view of a successful result used in the answer prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub sample_data: Vec<Row>,
    pub has_more_data: bool,
    /// The executor's row cap cut the result, so `total_rows` is a lower bound
    pub truncated_at_row_limit: bool,
}

impl DataSummary {
    /// Summarize a result, keeping at most `SUMMARY_SAMPLE_ROWS` rows.
    pub fn from_result(result: &QueryResult) -> Self {
        Self {
            total_rows: result.row_count(),
            columns: result.column_names.clone(),
            sample_data: result
                .data
                .iter()
                .take(SUMMARY_SAMPLE_ROWS)
                .cloned()
                .collect(),
            has_more_data: result.truncated || result.row_count() > SUMMARY_SAMPLE_ROWS,
            truncated_at_row_limit: result.truncated,
        }
    }

    /// Pretty JSON rendering for prompts.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
