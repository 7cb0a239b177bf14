//! Structured per-step events.
//!
//! Every pipeline step reports through one of these instead of printing.
//! Payloads go out at DEBUG, so `RUST_LOG=sql_agent=debug` (or `debug on` in
//! the terminal session) shows the full trace of a question.

use crate::models::{QueryResult, ReviewOutcome};
use tracing::{debug, info};

/// Which execution of the question a `QueryExecuted` event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Corrected,
}

impl Attempt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Corrected => "corrected",
        }
    }
}

#[derive(Debug)]
pub enum AgentEvent<'a> {
    SqlGenerated {
        sql: &'a str,
    },
    QueryExecuted {
        attempt: Attempt,
        result: &'a QueryResult,
    },
    ReviewCompleted {
        outcome: &'a ReviewOutcome,
    },
    AnswerSynthesized {
        answer: &'a str,
    },
}

impl AgentEvent<'_> {
    /// Stable event name, recorded in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SqlGenerated { .. } => "sql_generated",
            Self::QueryExecuted { .. } => "query_executed",
            Self::ReviewCompleted { .. } => "review_completed",
            Self::AnswerSynthesized { .. } => "answer_synthesized",
        }
    }

    pub fn emit(&self) {
        let event = self.name();
        match self {
            Self::SqlGenerated { sql } => {
                debug!(event, sql = %sql, "Generated SQL query");
            }
            Self::QueryExecuted { attempt, result } => {
                if result.success {
                    debug!(
                        event,
                        attempt = attempt.as_str(),
                        rows = result.row_count(),
                        columns = ?result.column_names,
                        truncated = result.truncated,
                        execution_time_ms = result.execution_time_ms,
                        sample = ?result.data.iter().take(3).collect::<Vec<_>>(),
                        "Query executed"
                    );
                } else {
                    info!(
                        event,
                        attempt = attempt.as_str(),
                        error = result.error_message.as_deref().unwrap_or_default(),
                        "Query failed"
                    );
                }
            }
            Self::ReviewCompleted { outcome } => match outcome {
                ReviewOutcome::Reviewed(review) => {
                    debug!(
                        event,
                        review = %review.review_text,
                        corrected_query = ?review.corrected_query,
                        "SQL review completed"
                    );
                }
                ReviewOutcome::Failed { reason } => {
                    info!(event, reason = %reason, "SQL review failed");
                }
            },
            Self::AnswerSynthesized { answer } => {
                debug!(event, answer = %answer, "Final response");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AgentEvent::SqlGenerated { sql: "SELECT 1" }.name(), "sql_generated");
        let result = QueryResult::success("SELECT 1", Vec::new());
        assert_eq!(
            AgentEvent::QueryExecuted {
                attempt: Attempt::Corrected,
                result: &result
            }
            .name(),
            "query_executed"
        );
        assert_eq!(Attempt::Initial.as_str(), "initial");
    }

    #[test]
    fn test_emit_without_subscriber_is_harmless() {
        let outcome = ReviewOutcome::Failed {
            reason: "bad json".to_string(),
        };
        AgentEvent::ReviewCompleted { outcome: &outcome }.emit();
        AgentEvent::AnswerSynthesized { answer: "42" }.emit();
    }
}
