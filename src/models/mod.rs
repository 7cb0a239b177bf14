//! Data models for the SQL agent.
//!
//! This module re-exports all model types used throughout the application.

pub mod agent;
pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use agent::{AgentResponse, DEFAULT_REVIEW_TEXT, ReviewOutcome, SqlReview};
pub use connection::{DatabaseConfig, DatabaseType};
pub use query::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, DataSummary, MAX_ROW_LIMIT, QueryResult, Row,
    SUMMARY_SAMPLE_ROWS,
};
pub use schema::{ColumnDefinition, DEFAULT_SAMPLE_ROWS, SchemaDescription, TableSchema};
