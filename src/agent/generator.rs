//! Question to SQL.

use super::strip_code_fences;
use crate::error::{AgentError, AgentResult};
use crate::llm::{CompletionService, prompts};
use crate::models::{DatabaseType, SchemaDescription};
use std::sync::Arc;

/// Turns a natural-language question into a candidate SQL statement.
pub struct SqlGenerator {
    completion: Arc<dyn CompletionService>,
    dialect: DatabaseType,
}

impl SqlGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, dialect: DatabaseType) -> Self {
        Self {
            completion,
            dialect,
        }
    }

    /// Generate SQL for `question`. The statement is not validated here.
    pub async fn generate(&self, question: &str, schema: &SchemaDescription) -> AgentResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::invalid_input("Question must not be empty"));
        }

        let prompt = prompts::generate_sql(schema.as_text(), question, self.dialect.display_name());
        let raw = self.completion.complete(&prompt).await?;
        Ok(strip_sql_fences(&raw))
    }
}

/// Strip a ```sql (or bare ```) fence around generated SQL.
pub fn strip_sql_fences(text: &str) -> String {
    strip_code_fences(text, "sql")
}
