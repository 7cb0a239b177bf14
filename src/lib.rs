//! SQL Agent Library
//!
//! Answers natural-language questions about a SQL database (MySQL,
//! PostgreSQL, SQLite): a completion service writes the SQL, the agent runs
//! it, reviews and repairs a failed query once, and summarizes the rows.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod render;
pub mod repl;

pub use agent::SqlAgent;
pub use config::Config;
pub use error::AgentError;
