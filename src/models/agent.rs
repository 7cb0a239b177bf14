//! Review and answer data models.

use crate::models::query::QueryResult;
use serde::{Deserialize, Serialize};

/// Review text used when the reviewer's JSON omits it.
pub const DEFAULT_REVIEW_TEXT: &str = "No review text provided.";

/// Critique of a failed query, with an optional replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlReview {
    pub review_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_query: Option<String>,
}

impl SqlReview {
    pub fn new(review_text: impl Into<String>, corrected_query: Option<String>) -> Self {
        Self {
            review_text: review_text.into(),
            corrected_query,
        }
    }
}

/// What the reviewer produced for a failed query.
///
/// `Failed` covers both a completion-service error and an unparseable
/// response; either way there is no correction to try.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Reviewed(SqlReview),
    Failed { reason: String },
}

impl ReviewOutcome {
    /// The corrected query to re-execute, if any.
    pub fn corrected_query(&self) -> Option<&str> {
        match self {
            Self::Reviewed(review) => review.corrected_query.as_deref(),
            Self::Failed { .. } => None,
        }
    }

    /// Review text worth showing to the answer synthesizer.
    pub fn review_info(&self) -> Option<&str> {
        match self {
            Self::Reviewed(review) => Some(review.review_text.as_str()),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Flatten into the review shape returned to callers.
    pub fn into_review(self) -> SqlReview {
        match self {
            Self::Reviewed(review) => review,
            Self::Failed { reason } => SqlReview::new(
                format!(
                    "Error: Could not review SQL query due to an internal error: {}",
                    reason
                ),
                None,
            ),
        }
    }
}

/// Final answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub natural_language_answer: String,
    /// The result the answer is based on (corrected attempt if one ran)
    pub query_result: QueryResult,
    /// Present only when the initial query failed and was reviewed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<SqlReview>,
}

impl AgentResponse {
    /// Response for a question that could not be processed at all.
    pub fn from_error(error: impl std::fmt::Display) -> Self {
        let message = error.to_string();
        Self {
            natural_language_answer: format!("Error processing question: {}", message),
            query_result: QueryResult::failure("", message),
            review: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewed_outcome_exposes_correction_and_info() {
        let outcome = ReviewOutcome::Reviewed(SqlReview::new(
            "Table name is misspelled.",
            Some("SELECT * FROM customers".to_string()),
        ));
        assert_eq!(outcome.corrected_query(), Some("SELECT * FROM customers"));
        assert_eq!(outcome.review_info(), Some("Table name is misspelled."));
        assert!(!outcome.is_failed());
    }

    #[test]
    fn test_failed_outcome_flattens_to_error_review() {
        let outcome = ReviewOutcome::Failed {
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(outcome.corrected_query().is_none());
        assert!(outcome.review_info().is_none());

        let review = outcome.into_review();
        assert!(review.review_text.starts_with("Error: Could not review SQL query"));
        assert!(review.review_text.contains("expected value"));
        assert!(review.corrected_query.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let response = AgentResponse::from_error("Completion service error (gemini): 503");
        assert_eq!(
            response.natural_language_answer,
            "Error processing question: Completion service error (gemini): 503"
        );
        assert!(!response.query_result.success);
        assert_eq!(response.query_result.sql_query, "");
        assert_eq!(
            response.query_result.error_message.as_deref(),
            Some("Completion service error (gemini): 503")
        );
        assert!(response.review.is_none());
    }
}
