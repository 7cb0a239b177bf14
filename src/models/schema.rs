//! Schema-related data models.
//!
//! This module defines the schema description the agent grounds SQL
//! generation on: tables, their columns, and a few sample rows.

use crate::models::query::Row;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Default number of sample rows fetched per table.
pub const DEFAULT_SAMPLE_ROWS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Database-specific type as reported by the catalog (e.g. "varchar(255)")
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            is_primary_key: false,
        }
    }

    /// Mark as primary key.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub sample_rows: Vec<Row>,
}

impl TableSchema {
    /// Create a table description without sample rows.
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            sample_rows: Vec::new(),
        }
    }

    /// Attach sample rows.
    pub fn with_sample_rows(mut self, rows: Vec<Row>) -> Self {
        self.sample_rows = rows;
        self
    }

    /// Names of the primary key columns.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    fn render_into(&self, out: &mut String) {
        let _ = writeln!(out, "Table: {}", self.table_name);
        for col in &self.columns {
            if col.is_primary_key {
                let _ = writeln!(out, "  - {}: {} (Primary Key)", col.name, col.data_type);
            } else {
                let _ = writeln!(out, "  - {}: {}", col.name, col.data_type);
            }
        }
        if !self.sample_rows.is_empty() {
            out.push_str("  Sample data:\n");
            for row in &self.sample_rows {
                let rendered = serde_json::to_string(row).unwrap_or_default();
                let _ = writeln!(out, "    {}", rendered);
            }
        }
    }
}

/// Text description of the database used as grounding context.
///
/// Built once when the agent starts and never refreshed, so it does not
/// reflect schema changes made during the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDescription {
    tables: Vec<TableSchema>,
    text: String,
}

impl SchemaDescription {
    /// Build a description from introspected tables.
    pub fn new(tables: Vec<TableSchema>) -> Self {
        let mut text = String::new();
        for (i, table) in tables.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            table.render_into(&mut text);
        }
        Self { tables, text }
    }

    /// Use a pre-rendered description verbatim.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            tables: Vec::new(),
            text: text.into(),
        }
    }

    /// The rendered description passed to prompts.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl std::fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customers() -> TableSchema {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        row.insert("name".to_string(), json!("Ada"));
        TableSchema::new(
            "customers",
            vec![
                ColumnDefinition::new("id", "int", false).with_primary_key(true),
                ColumnDefinition::new("name", "varchar(255)", true),
            ],
        )
        .with_sample_rows(vec![row])
    }

    #[test]
    fn test_render_marks_primary_key_and_samples() {
        let schema = SchemaDescription::new(vec![customers()]);
        let text = schema.as_text();
        assert!(text.contains("Table: customers"));
        assert!(text.contains("  - id: int (Primary Key)"));
        assert!(text.contains("  - name: varchar(255)\n"));
        assert!(text.contains("  Sample data:"));
        assert!(text.contains(r#"    {"id":1,"name":"Ada"}"#));
    }

    #[test]
    fn test_render_omits_sample_header_without_rows() {
        let table = TableSchema::new("empty", vec![ColumnDefinition::new("id", "int", false)]);
        let schema = SchemaDescription::new(vec![table]);
        assert!(!schema.as_text().contains("Sample data"));
    }

    #[test]
    fn test_multiple_tables_and_names() {
        let orders = TableSchema::new(
            "orders",
            vec![ColumnDefinition::new("id", "int", false).with_primary_key(true)],
        );
        let schema = SchemaDescription::new(vec![customers(), orders]);
        assert_eq!(schema.table_names(), vec!["customers", "orders"]);
        assert!(schema.as_text().contains("\nTable: orders"));
        assert_eq!(schema.tables()[0].primary_key(), vec!["id"]);
    }

    #[test]
    fn test_empty_description() {
        assert!(SchemaDescription::new(Vec::new()).is_empty());
        assert!(!SchemaDescription::from_text("Table: t").is_empty());
    }
}
