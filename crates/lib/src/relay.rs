//! Webhook handler: one update in, at most one completion and one reply out.

use crate::channels::{TelegramApi, TelegramError, TelegramUpdate};
use crate::llm::{CompletionProvider, LlmError};
use std::sync::Arc;

/// What the relay did with an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No message or no text; nothing was called.
    Ignored,
    /// The model's reply was delivered to this chat.
    Replied { chat_id: i64 },
}

/// Per-request failure, classified by the adapter that failed.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Provider(#[from] LlmError),
    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

impl RelayError {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Provider(_) => "provider",
            RelayError::Telegram(_) => "telegram",
        }
    }
}

/// Stateless relay between Telegram and a completion provider. Clones share the adapters.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn CompletionProvider>,
    telegram: Arc<dyn TelegramApi>,
}

impl Relay {
    pub fn new(provider: Arc<dyn CompletionProvider>, telegram: Arc<dyn TelegramApi>) -> Self {
        Self { provider, telegram }
    }

    pub fn telegram(&self) -> &Arc<dyn TelegramApi> {
        &self.telegram
    }

    /// Ask the provider about the message text and send the trimmed answer back to the chat.
    /// Errors from either adapter are returned as-is; nothing is retried and nothing is sent
    /// to the chat on failure.
    pub async fn handle_update(&self, update: &TelegramUpdate) -> Result<RelayOutcome, RelayError> {
        let Some(inbound) = update.inbound_text() else {
            log::debug!("update {}: no message text, ignoring", update.update_id);
            return Ok(RelayOutcome::Ignored);
        };
        log::info!(
            "chat {}: received {} chars",
            inbound.chat_id,
            inbound.text.chars().count()
        );
        log::debug!("chat {}: user wrote {:?}", inbound.chat_id, inbound.text);

        let reply = self.provider.complete(inbound.text).await?;
        let reply = reply.trim();
        self.telegram.send_message(inbound.chat_id, reply).await?;

        log::info!(
            "chat {}: replied with {} chars",
            inbound.chat_id,
            reply.chars().count()
        );
        Ok(RelayOutcome::Replied {
            chat_id: inbound.chat_id,
        })
    }
}
