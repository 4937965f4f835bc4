//! Telegram Bot API adapter: webhook registration and sendMessage.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// Transport failure. The request URL is stripped since it carries the bot token.
    #[error("telegram request failed: {0}")]
    Request(reqwest::Error),
    #[error("telegram {method} failed: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Request(e.without_url())
    }
}

/// Bot API envelope: `{"ok": bool, "description": "..."}`; `result` is not needed here.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Outbound Telegram operations used by the relay. Implementations must be safe to share
/// between concurrently handled requests.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Remove the current webhook; optionally drop updates Telegram is still holding.
    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TelegramError>;

    /// Point Telegram at `url` for update delivery.
    async fn set_webhook(&self, url: &str) -> Result<(), TelegramError>;

    /// Send a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;

    /// Replace whatever webhook is registered: delete (clearing the backlog when asked), then set.
    async fn register_webhook(
        &self,
        url: &str,
        drop_pending_updates: bool,
    ) -> Result<(), TelegramError> {
        self.delete_webhook(drop_pending_updates).await?;
        self.set_webhook(url).await
    }
}

/// reqwest-backed Bot API client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpTelegramApi {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

impl HttpTelegramApi {
    pub fn new(token: String, api_base: Option<String>, timeout: Duration) -> Result<Self, TelegramError> {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            token,
            api_base,
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// POST a JSON body to a Bot API method and check both the HTTP status and the `ok` flag.
    async fn call(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> Result<(), TelegramError> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(r) if status.is_success() && r.ok => Ok(()),
            Some(r) => Err(TelegramError::Api {
                method,
                description: r
                    .description
                    .unwrap_or_else(|| format!("{} (ok: {})", status, r.ok)),
            }),
            None => Err(TelegramError::Api {
                method,
                description: format!("{} {}", status, text),
            }),
        }
    }
}

#[async_trait]
impl TelegramApi for HttpTelegramApi {
    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TelegramError> {
        self.call(
            "deleteWebhook",
            serde_json::json!({ "drop_pending_updates": drop_pending_updates }),
        )
        .await
    }

    async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        self.call("setWebhook", serde_json::json!({ "url": url })).await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.call(
            "sendMessage",
            serde_json::json!({ "chat_id": chat_id, "text": text }),
        )
        .await
    }
}
