//! Schema introspection module.
//!
//! This module reads table and column metadata plus a few sample rows and
//! renders them into the [`SchemaDescription`] used to ground SQL generation.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{AgentError, AgentResult};
use crate::models::{ColumnDefinition, DatabaseType, Row, SchemaDescription, TableSchema};
use tracing::{debug, info, warn};

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List all base tables of the connected database.
    pub async fn list_tables(pool: &DbPool) -> AgentResult<Vec<String>> {
        match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
    }

    /// Describe a table's columns.
    pub async fn describe_table(pool: &DbPool, table_name: &str) -> AgentResult<TableSchema> {
        let columns = match pool {
            DbPool::Postgres(p) => postgres::fetch_columns(p, table_name).await?,
            DbPool::MySql(p) => mysql::fetch_columns(p, table_name).await?,
            DbPool::SQLite(p) => sqlite::fetch_columns(p, table_name).await?,
        };
        if columns.is_empty() {
            return Err(AgentError::schema(
                format!("Table '{}' not found", table_name),
                table_name.to_string(),
            ));
        }
        Ok(TableSchema::new(table_name, columns))
    }

    /// Fetch up to `limit` rows of a table.
    ///
    /// Sent unprepared like generated SQL, so values decode the same way as
    /// in query results (Postgres returns them in text format).
    pub async fn sample_rows(pool: &DbPool, table_name: &str, limit: u32) -> AgentResult<Vec<Row>> {
        use sqlx::Executor;
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_identifier(table_name, pool.db_type()),
            limit
        );
        match pool {
            DbPool::Postgres(p) => {
                let rows = p.fetch_all(sql.as_str()).await?;
                Ok(rows.iter().map(|r| r.to_json_map()).collect())
            }
            DbPool::MySql(p) => {
                let rows = p.fetch_all(sql.as_str()).await?;
                Ok(rows.iter().map(|r| r.to_json_map()).collect())
            }
            DbPool::SQLite(p) => {
                let rows = p.fetch_all(sql.as_str()).await?;
                Ok(rows.iter().map(|r| r.to_json_map()).collect())
            }
        }
    }

    /// Build the full description of the database.
    ///
    /// Never fails: a table whose metadata cannot be read is left out, a table
    /// whose rows cannot be sampled is kept without samples, and a failure to
    /// list tables yields an empty description.
    pub async fn describe_database(pool: &DbPool, sample_limit: u32) -> SchemaDescription {
        let table_names = match Self::list_tables(pool).await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list tables");
                return SchemaDescription::default();
            }
        };

        let mut tables = Vec::with_capacity(table_names.len());
        for name in &table_names {
            let table = match Self::describe_table(pool, name).await {
                Ok(table) => table,
                Err(e) => {
                    warn!(table = %name, error = %e, "Failed to describe table");
                    continue;
                }
            };

            let table = if sample_limit == 0 {
                table
            } else {
                match Self::sample_rows(pool, name, sample_limit).await {
                    Ok(rows) => table.with_sample_rows(rows),
                    Err(e) => {
                        warn!(table = %name, error = %e, "Failed to fetch sample rows");
                        table
                    }
                }
            };
            tables.push(table);
        }

        info!(tables = tables.len(), "Schema introspection complete");
        SchemaDescription::new(tables)
    }
}

/// Quote an identifier for the backend, doubling any embedded quote character.
pub fn quote_identifier(name: &str, db_type: DatabaseType) -> String {
    match db_type {
        DatabaseType::MySQL => format!("`{}`", name.replace('`', "``")),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
    }
}

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable::text AS is_nullable,
            CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = 'public'
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = 'public'
        ORDER BY c.ordinal_position
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> AgentResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("table_name").ok())
            .filter(|name| !name.is_empty())
            .collect();

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn fetch_columns(
        pool: &PgPool,
        table_name: &str,
    ) -> AgentResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let column_type: String = row.try_get("column_type")?;
                let nullable: String = row.try_get("is_nullable")?;
                let is_pk: bool = row.try_get("is_primary_key")?;
                Ok(ColumnDefinition::new(name, column_type, nullable == "YES")
                    .with_primary_key(is_pk))
            })
            .collect()
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    pub async fn list_tables(pool: &MySqlPool) -> AgentResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn fetch_columns(
        pool: &MySqlPool,
        table_name: &str,
    ) -> AgentResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME");
                let column_type = get_string(row, "COLUMN_TYPE");
                let nullable = get_string(row, "IS_NULLABLE");
                let is_pk = get_string(row, "COLUMN_KEY") == "PRI";
                ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk)
            })
            .collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_tables(pool: &SqlitePool) -> AgentResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn fetch_columns(
        pool: &SqlitePool,
        table_name: &str,
    ) -> AgentResult<Vec<ColumnDefinition>> {
        let pragma_query = format!("PRAGMA table_info('{}')", table_name.replace('\'', "''"));
        let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                let data_type: String = row.try_get("type")?;
                let notnull: i32 = row.try_get("notnull")?;
                let pk: i32 = row.try_get("pk")?;
                Ok(ColumnDefinition::new(name, data_type, notnull == 0).with_primary_key(pk > 0))
            })
            .collect()
    }
}
