//! The single-question answer flow.

use super::events::{AgentEvent, Attempt};
use super::generator::SqlGenerator;
use super::reviewer::SqlReviewer;
use super::synthesizer::ResponseSynthesizer;
use crate::db::QueryRunner;
use crate::error::{AgentError, AgentResult};
use crate::llm::CompletionService;
use crate::models::{AgentResponse, DatabaseType, ReviewOutcome, SchemaDescription};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Answers natural-language questions against one database.
///
/// Holds the schema description captured at startup; it is never refreshed.
pub struct SqlAgent {
    generator: SqlGenerator,
    reviewer: SqlReviewer,
    synthesizer: ResponseSynthesizer,
    runner: Arc<dyn QueryRunner>,
    schema: SchemaDescription,
}

impl SqlAgent {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        runner: Arc<dyn QueryRunner>,
        schema: SchemaDescription,
        dialect: DatabaseType,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(Arc::clone(&completion), dialect),
            reviewer: SqlReviewer::new(Arc::clone(&completion), dialect),
            synthesizer: ResponseSynthesizer::new(completion),
            runner,
            schema,
        }
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    /// Answer one question.
    ///
    /// Never fails: generation errors and panics become an error response
    /// whose answer starts with "Error processing question:".
    pub async fn ask_question(&self, question: &str) -> AgentResponse {
        let span = info_span!("question", id = %Uuid::new_v4());

        async {
            info!(question = %question, "Processing question");
            match AssertUnwindSafe(self.run_pipeline(question))
                .catch_unwind()
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    error!(error = %e, "Error processing question");
                    AgentResponse::from_error(e)
                }
                Err(panic) => {
                    let e = AgentError::internal(panic_message(panic.as_ref()));
                    error!(error = %e, "Question handling panicked");
                    AgentResponse::from_error(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(&self, question: &str) -> AgentResult<AgentResponse> {
        let sql = self.generator.generate(question, &self.schema).await?;
        AgentEvent::SqlGenerated { sql: &sql }.emit();

        let initial = self.runner.run(&sql).await;
        AgentEvent::QueryExecuted {
            attempt: Attempt::Initial,
            result: &initial,
        }
        .emit();

        let (final_result, outcome) = if initial.success {
            (initial, None)
        } else {
            warn!(
                error = initial.error_message.as_deref().unwrap_or_default(),
                "Initial SQL query failed, attempting review and correction"
            );
            let outcome = self
                .reviewer
                .review(&sql, initial.error_message.as_deref(), &self.schema)
                .await;
            AgentEvent::ReviewCompleted { outcome: &outcome }.emit();

            let final_result = match outcome.corrected_query() {
                Some(corrected) => {
                    let retried = self.runner.run(corrected).await;
                    AgentEvent::QueryExecuted {
                        attempt: Attempt::Corrected,
                        result: &retried,
                    }
                    .emit();
                    if !retried.success {
                        error!(
                            error = retried.error_message.as_deref().unwrap_or_default(),
                            "Corrected SQL query also failed"
                        );
                    }
                    retried
                }
                None => {
                    warn!("Reviewer provided no corrected query");
                    initial
                }
            };
            (final_result, Some(outcome))
        };

        let review_info = outcome.as_ref().and_then(ReviewOutcome::review_info);
        let answer = self
            .synthesizer
            .synthesize(question, &final_result, review_info)
            .await;
        AgentEvent::AnswerSynthesized { answer: &answer }.emit();

        Ok(AgentResponse {
            natural_language_answer: answer,
            query_result: final_result,
            review: outcome.map(ReviewOutcome::into_review),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic while processing question".to_string()
    }
}
