//! Inbound Telegram update (webhook POST body). Only the fields the relay reads are modeled;
//! everything else in the payload is ignored by serde.

use serde::Deserialize;

/// One Telegram update as delivered to the webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Chat and text of a message worth answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

impl TelegramUpdate {
    /// The chat id and text when the update carries a message with non-empty text.
    pub fn inbound_text(&self) -> Option<InboundText<'_>> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_deref()?;
        if text.is_empty() {
            return None;
        }
        Some(InboundText {
            chat_id: msg.chat.id,
            text,
        })
    }
}
