//! Telegram channel: inbound update payloads and the outbound Bot API adapter.

mod telegram;
mod update;

pub use telegram::{HttpTelegramApi, TelegramApi, TelegramError};
pub use update::{InboundText, TelegramChat, TelegramMessage, TelegramUpdate};
