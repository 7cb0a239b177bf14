//! Question answering pipeline.
//!
//! [`SqlAgent::ask_question`] runs generate, execute, review-and-retry-once,
//! then synthesize. Each stage lives in its own module and talks to the
//! outside world only through [`CompletionService`](crate::llm::CompletionService)
//! and [`QueryRunner`](crate::db::QueryRunner).

pub mod events;
pub mod generator;
pub mod orchestrator;
pub mod reviewer;
pub mod synthesizer;

pub use events::{AgentEvent, Attempt};
pub use generator::{SqlGenerator, strip_sql_fences};
pub use orchestrator::SqlAgent;
pub use reviewer::{SqlReviewer, parse_review};
pub use synthesizer::ResponseSynthesizer;

/// Remove a surrounding markdown code fence.
///
/// Trims, drops a leading "```<lang>" (or bare "```") and a trailing "```",
/// then trims again. Text without fences only gets trimmed.
pub(crate) fn strip_code_fences(text: &str, lang: &str) -> String {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.get(..lang.len()) {
            Some(tag) if tag.eq_ignore_ascii_case(lang) => &rest[lang.len()..],
            _ => rest,
        };
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    body.trim().to_string()
}
