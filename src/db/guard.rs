//! Read-only statement guard.
//!
//! When enabled, the executor refuses anything but read-only statements
//! (SELECT/WITH/VALUES, SHOW, EXPLAIN of a read) before it reaches the
//! database. Classification is AST-based via
//! [sqlparser](https://docs.rs/sqlparser/), using the backend's dialect.
//! Queries are walked into their CTEs and set operations, so a
//! data-modifying CTE (`WITH d AS (DELETE ... RETURNING *) SELECT ...`) or a
//! `SELECT ... INTO new_table` is rejected like the plain write.

use crate::error::{AgentError, AgentResult};
use crate::models::DatabaseType;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Reason given for every rejected statement.
const READ_ONLY_REASON: &str = "only read-only queries are allowed while --enforce-readonly is set";

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Validate that `sql` only reads.
///
/// Returns `Err(AgentError::Permission)` naming the offending statement
/// keyword, or `Err(AgentError::InvalidInput)` if the SQL does not parse.
///
/// # Examples
///
/// ```
/// use sql_agent::db::guard::validate_readonly;
/// use sql_agent::models::DatabaseType;
///
/// assert!(validate_readonly("SELECT COUNT(*) FROM customers", DatabaseType::MySQL).is_ok());
/// assert!(validate_readonly("DELETE FROM customers", DatabaseType::MySQL).is_err());
/// ```
pub fn validate_readonly(sql: &str, db_type: DatabaseType) -> AgentResult<()> {
    let dialect = get_dialect(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
        AgentError::invalid_input(format!("Failed to parse SQL statement. Error: {}", e))
    })?;

    if statements.is_empty() {
        return Err(AgentError::invalid_input("Empty SQL statement"));
    }

    for stmt in &statements {
        if let Some(keyword) = write_keyword(stmt) {
            return Err(AgentError::permission(keyword, READ_ONLY_REASON));
        }
    }

    Ok(())
}

/// Keyword of the first writing part of `stmt`, or `None` if it only reads.
fn write_keyword(stmt: &Statement) -> Option<String> {
    match stmt {
        Statement::Query(query) => query_write_keyword(query),
        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. }
        | Statement::ExplainTable { .. } => None,
        // EXPLAIN ANALYZE executes its statement, so the inner one must read too
        Statement::Explain { statement, .. } => write_keyword(statement),
        _ => Some(statement_keyword(stmt)),
    }
}

fn query_write_keyword(query: &Query) -> Option<String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            if let Some(keyword) = query_write_keyword(&cte.query) {
                return Some(keyword);
            }
        }
    }
    set_expr_write_keyword(&query.body)
}

fn set_expr_write_keyword(expr: &SetExpr) -> Option<String> {
    match expr {
        SetExpr::Select(select) => select.into.as_ref().map(|_| "SELECT INTO".to_string()),
        SetExpr::Query(query) => query_write_keyword(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_write_keyword(left).or_else(|| set_expr_write_keyword(right))
        }
        SetExpr::Insert(stmt)
        | SetExpr::Update(stmt)
        | SetExpr::Delete(stmt)
        | SetExpr::Merge(stmt) => Some(statement_keyword(stmt)),
        SetExpr::Values(_) | SetExpr::Table(_) => None,
    }
}

/// Leading keyword(s) of the statement, e.g. "DELETE" or "CREATE TABLE".
fn statement_keyword(stmt: &Statement) -> String {
    let rendered = stmt.to_string();
    let mut words = rendered.split_whitespace();
    let first = words.next().unwrap_or("UNKNOWN").to_uppercase();
    match first.as_str() {
        "CREATE" | "DROP" | "ALTER" => match words.next() {
            Some(second) => format!("{} {}", first, second.to_uppercase()),
            None => first,
        },
        _ => first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DB_TYPE: DatabaseType = DatabaseType::MySQL;

    #[test]
    fn test_select_and_cte_allowed() {
        assert!(validate_readonly("SELECT COUNT(*) FROM customers;", TEST_DB_TYPE).is_ok());
        let cte = "WITH big AS (SELECT * FROM orders WHERE total > 100) SELECT COUNT(*) FROM big";
        assert!(validate_readonly(cte, TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_complex_select_with_subquery() {
        let sql = r#"
            SELECT c.name, (SELECT COUNT(*) FROM orders o WHERE o.customer_id = c.id) AS orders
            FROM customers c
            WHERE c.id IN (SELECT customer_id FROM vip)
        "#;
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_show_tables_allowed() {
        assert!(validate_readonly("SHOW TABLES", TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_explain_select_allowed() {
        assert!(validate_readonly("EXPLAIN SELECT * FROM customers", TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_delete_rejected_with_keyword() {
        let err = validate_readonly("DELETE FROM customers", TEST_DB_TYPE).unwrap_err();
        match err {
            AgentError::Permission { operation, reason } => {
                assert_eq!(operation, "DELETE");
                assert!(reason.contains("read-only"));
            }
            other => panic!("expected permission error, got {:?}", other),
        }
    }

    #[test]
    fn test_ddl_rejected_with_object_kind() {
        let err = validate_readonly("DROP TABLE customers", TEST_DB_TYPE).unwrap_err();
        assert!(err.to_string().contains("DROP TABLE"));
    }

    #[test]
    fn test_insert_select_rejected() {
        let sql = "INSERT INTO archive SELECT * FROM customers";
        assert!(matches!(
            validate_readonly(sql, TEST_DB_TYPE),
            Err(AgentError::Permission { .. })
        ));
    }

    #[test]
    fn test_write_hidden_after_select_rejected() {
        let sql = "SELECT 1; UPDATE customers SET name = 'x'";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_data_modifying_cte_rejected() {
        let sql = "WITH d AS (DELETE FROM customers RETURNING *) SELECT COUNT(*) FROM d";
        let err = validate_readonly(sql, DatabaseType::PostgreSQL).unwrap_err();
        match err {
            AgentError::Permission { operation, .. } => assert_eq!(operation, "DELETE"),
            other => panic!("expected permission error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_in_later_cte_rejected() {
        let sql = "WITH a AS (SELECT id FROM orders), \
                   u AS (UPDATE customers SET name = 'x' RETURNING id) \
                   SELECT id FROM u";
        assert!(matches!(
            validate_readonly(sql, DatabaseType::PostgreSQL),
            Err(AgentError::Permission { .. })
        ));
    }

    #[test]
    fn test_select_into_rejected() {
        let err = validate_readonly(
            "SELECT * INTO customers_copy FROM customers",
            DatabaseType::PostgreSQL,
        )
        .unwrap_err();
        assert!(err.to_string().contains("SELECT INTO"));
    }

    #[test]
    fn test_read_only_cte_and_union_allowed() {
        let sql = "WITH a AS (SELECT id FROM customers) SELECT id FROM a UNION SELECT customer_id FROM orders";
        assert!(validate_readonly(sql, DatabaseType::PostgreSQL).is_ok());
    }

    #[test]
    fn test_transaction_control_rejected() {
        assert!(validate_readonly("COMMIT", DatabaseType::PostgreSQL).is_err());
    }

    #[test]
    fn test_unparseable_is_invalid_input() {
        assert!(matches!(
            validate_readonly("SELEC * FORM customers", TEST_DB_TYPE),
            Err(AgentError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_sqlite_dialect() {
        assert!(validate_readonly("SELECT * FROM \"customers\" LIMIT 3", DatabaseType::SQLite).is_ok());
    }
}
