//! Completion providers: one prompt in, one text reply out.
//!
//! Gemini (generateContent) and OpenAI (chat completions) sit behind [`CompletionProvider`];
//! [`build_provider`] picks one from [`Settings`] at startup.

mod gemini;
mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::{ProviderKind, Settings};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("llm returned no text")]
    EmptyResponse,
}

/// Generate a completion for a single free-text prompt (no history, no system prompt).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Build the provider selected in settings.
pub fn build_provider(settings: &Settings) -> Result<Arc<dyn CompletionProvider>, LlmError> {
    let provider: Arc<dyn CompletionProvider> = match settings.provider {
        ProviderKind::Gemini => Arc::new(GeminiClient::new(
            settings.api_key.clone(),
            settings.model.clone(),
            settings.llm_base_url.clone(),
            settings.llm_timeout,
        )?),
        ProviderKind::Openai => Arc::new(OpenAiClient::new(
            settings.api_key.clone(),
            settings.model.clone(),
            settings.llm_base_url.clone(),
            settings.llm_timeout,
        )?),
    };
    log::info!(
        "llm provider: {} (model {})",
        settings.provider.name(),
        settings.model
    );
    Ok(provider)
}
