//! Completion service clients.
//!
//! The agent only needs "prompt in, text out". [`CompletionService`] is that
//! seam; [`GeminiClient`] and [`OpenAiClient`] are the HTTP implementations and
//! tests substitute scripted ones.

pub mod gemini;
pub mod openai;
pub mod prompts;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout for completion calls.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// A text-generation endpoint.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> AgentResult<String>;

    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;
}

/// Supported completion providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    #[value(name = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Provider-specific environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Resolved settings for building a completion client.
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// Sensitive - never log
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl LlmSettings {
    /// Settings with the provider's default model, endpoint and timeout.
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            temperature: None,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"****")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Build the HTTP client shared by the provider implementations.
pub(crate) fn http_client(timeout: Duration) -> AgentResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Build the completion client for the configured provider.
pub fn build_client(settings: &LlmSettings) -> AgentResult<Arc<dyn CompletionService>> {
    if settings.api_key.trim().is_empty() {
        return Err(AgentError::config(format!(
            "Missing API key for {}: set LLM_API_KEY or {}",
            settings.provider,
            settings.provider.api_key_env()
        )));
    }

    let client: Arc<dyn CompletionService> = match settings.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(settings)?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(settings)?),
    };
    Ok(client)
}

/// Read a non-2xx response into a completion error.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> AgentError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    AgentError::completion(provider, format!("API error ({}): {}", status, body.trim()))
}
