//! Result to natural-language answer.

use crate::llm::{CompletionService, prompts};
use crate::models::{DataSummary, QueryResult};
use std::sync::Arc;
use tracing::warn;

/// Answer used when no rows came back.
pub const NO_RESULTS_ANSWER: &str = "I found no results for your question in the database.";

/// Explains a query result in plain language.
pub struct ResponseSynthesizer {
    completion: Arc<dyn CompletionService>,
}

impl ResponseSynthesizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Produce the final answer. Never fails.
    ///
    /// Failed and empty results are answered from fixed templates without a
    /// completion call. `review_text` is only passed for a successful review.
    pub async fn synthesize(
        &self,
        question: &str,
        result: &QueryResult,
        review_text: Option<&str>,
    ) -> String {
        if !result.success {
            return format!(
                "I encountered an error while processing your question: {}",
                result.error_message.as_deref().unwrap_or_default()
            );
        }
        if result.is_empty() {
            return NO_RESULTS_ANSWER.to_string();
        }

        let summary = DataSummary::from_result(result);
        let prompt = prompts::synthesize_answer(question, &result.sql_query, &summary, review_text);

        match self.completion.complete(&prompt).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to generate natural language response");
                let count = if result.truncated {
                    format!("at least {}", result.row_count())
                } else {
                    result.row_count().to_string()
                };
                format!(
                    "I found {} results, but encountered an error formatting the response.",
                    count
                )
            }
        }
    }
}
