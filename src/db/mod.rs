//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection bootstrap
//! - Query execution
//! - Read-only statement guard
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod guard;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::{EXECUTION_ERROR_PREFIX, QueryExecutor, QueryRunner};
pub use guard::validate_readonly;
pub use pool::DbPool;
pub use schema::SchemaInspector;
