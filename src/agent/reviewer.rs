//! Critique and repair of a failed query.

use super::strip_code_fences;
use crate::llm::{CompletionService, prompts};
use crate::models::{DEFAULT_REVIEW_TEXT, DatabaseType, ReviewOutcome, SchemaDescription, SqlReview};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shape of the reviewer's JSON answer. Both keys may be missing.
#[derive(Debug, Deserialize)]
struct ReviewPayload {
    #[serde(default)]
    review: Option<String>,
    #[serde(default)]
    corrected_query: Option<String>,
}

/// Asks the completion service what went wrong with a query.
pub struct SqlReviewer {
    completion: Arc<dyn CompletionService>,
    dialect: DatabaseType,
}

impl SqlReviewer {
    pub fn new(completion: Arc<dyn CompletionService>, dialect: DatabaseType) -> Self {
        Self {
            completion,
            dialect,
        }
    }

    /// Review `sql`. Never fails; problems come back as `ReviewOutcome::Failed`.
    pub async fn review(
        &self,
        sql: &str,
        error: Option<&str>,
        schema: &SchemaDescription,
    ) -> ReviewOutcome {
        let prompt = prompts::review_sql(sql, error, schema.as_text(), self.dialect.display_name());

        info!(provider = self.completion.name(), "Sending SQL query for review");
        let raw = match self.completion.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Review request failed");
                return ReviewOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match parse_review(&raw) {
            Ok(review) => ReviewOutcome::Reviewed(review),
            Err(e) => {
                warn!(error = %e, "Review response was not valid JSON");
                ReviewOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Parse the reviewer's (possibly ```json fenced) JSON object.
pub fn parse_review(text: &str) -> Result<SqlReview, serde_json::Error> {
    let body = strip_code_fences(text, "json");
    let payload: ReviewPayload = serde_json::from_str(&body)?;

    let corrected_query = payload
        .corrected_query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    Ok(SqlReview::new(
        payload
            .review
            .unwrap_or_else(|| DEFAULT_REVIEW_TEXT.to_string()),
        corrected_query,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, AgentResult};
    use async_trait::async_trait;

    struct Fixed(AgentResult<String>);

    #[async_trait]
    impl CompletionService for Fixed {
        async fn complete(&self, _prompt: &str) -> AgentResult<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AgentError::completion("fixed", e.to_string())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn reviewer(reply: AgentResult<String>) -> SqlReviewer {
        SqlReviewer::new(Arc::new(Fixed(reply)), DatabaseType::MySQL)
    }

    #[test]
    fn test_parse_fenced_json() {
        let review = parse_review(
            "```json\n{\"review\": \"Table name typo.\", \"corrected_query\": \"SELECT * FROM customers\"}\n```",
        )
        .unwrap();
        assert_eq!(review.review_text, "Table name typo.");
        assert_eq!(review.corrected_query.as_deref(), Some("SELECT * FROM customers"));
    }

    #[test]
    fn test_parse_missing_keys_use_defaults() {
        let review = parse_review("{}").unwrap();
        assert_eq!(review.review_text, DEFAULT_REVIEW_TEXT);
        assert!(review.corrected_query.is_none());
    }

    #[test]
    fn test_parse_null_and_blank_correction() {
        let review = parse_review(r#"{"review": "Looks fine.", "corrected_query": null}"#).unwrap();
        assert!(review.corrected_query.is_none());

        let review = parse_review(r#"{"review": "Looks fine.", "corrected_query": "  "}"#).unwrap();
        assert!(review.corrected_query.is_none());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_review("The query has a typo in the table name.").is_err());
        assert!(parse_review("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_review_unparseable_is_failed_outcome() {
        let outcome = reviewer(Ok("not json".to_string()))
            .review("SELECT * FROM custmers", None, &SchemaDescription::default())
            .await;
        assert!(outcome.is_failed());
        assert!(outcome.corrected_query().is_none());
        let review = outcome.into_review();
        assert!(
            review
                .review_text
                .starts_with("Error: Could not review SQL query due to an internal error:")
        );
    }

    #[tokio::test]
    async fn test_review_completion_error_is_failed_outcome() {
        let outcome = reviewer(Err(AgentError::completion("fixed", "503")))
            .review("SELECT 1", Some("boom"), &SchemaDescription::default())
            .await;
        match outcome {
            ReviewOutcome::Failed { reason } => assert!(reason.contains("503")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_review_success() {
        let outcome = reviewer(Ok(
            r#"{"review": "Typo.", "corrected_query": "SELECT * FROM customers"}"#.to_string(),
        ))
        .review("SELECT * FROM custmers", Some("no such table"), &SchemaDescription::default())
        .await;
        assert_eq!(outcome.corrected_query(), Some("SELECT * FROM customers"));
        assert_eq!(outcome.review_info(), Some("Typo."));
    }
}
