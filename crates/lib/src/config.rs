//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.tgrelay/config.json`) and the process
//! environment; environment values win. [`Config::resolve`] turns the merged view into
//! [`Settings`], failing fast when a required secret is missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Top-level application config as read from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// HTTP server bind and port.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telegram bot token and webhook registration.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion provider selection and credentials.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Outbound HTTP timeouts.
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    /// Port for the HTTP server (default 8000). Overridden by PORT env.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"). Overridden by BIND env.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_TOKEN (or TELEGRAM_BOT_TOKEN) env.
    pub bot_token: Option<String>,
    /// Public URL Telegram POSTs updates to. Overridden by WEBHOOK_URL env.
    pub webhook_url: Option<String>,
    /// Drop the pending update backlog when the webhook is re-registered.
    #[serde(default = "default_true")]
    pub drop_pending_updates: bool,
    /// What to do when webhook registration fails at startup.
    #[serde(default)]
    pub registration: RegistrationPolicy,
    /// Bot API base URL (tests and self-hosted Bot API servers). Overridden by TELEGRAM_API_BASE env.
    pub api_base: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            webhook_url: None,
            drop_pending_updates: true,
            registration: RegistrationPolicy::default(),
            api_base: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Startup webhook registration policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationPolicy {
    /// Registration failure aborts startup.
    #[default]
    Required,
    /// Registration failure is logged and the server starts anyway.
    BestEffort,
}

/// Which completion backend answers messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Openai,
}

impl ProviderKind {
    /// Parse a provider name (case-insensitive). Accepts "gemini"/"google" and "openai"/"open_ai".
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" | "open_ai" => Some(Self::Openai),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Openai => "openai",
        }
    }

    /// Env var holding the API key for this provider.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::Openai => DEFAULT_OPENAI_MODEL,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LlmConfig {
    /// "gemini" (default) or "openai". Overridden by LLM_PROVIDER env.
    pub provider: Option<String>,
    /// Model id; when absent the provider default is used. Overridden by LLM_MODEL env.
    pub model: Option<String>,
    /// API key for the selected provider. Overridden by GOOGLE_API_KEY / OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Provider base URL. Overridden by GEMINI_API_BASE / OPENAI_API_BASE env.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_telegram_timeout_secs")]
    pub telegram_timeout_secs: u64,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            telegram_timeout_secs: default_telegram_timeout_secs(),
            llm_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_telegram_timeout_secs() -> u64 {
    15
}

fn default_llm_timeout_secs() -> u64 {
    60
}

/// Configuration problems detected before the server starts. Always fatal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: set {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("unknown LLM provider {0:?} (expected \"gemini\" or \"openai\")")]
    UnknownProvider(String),
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Fully resolved runtime settings: every required secret is present.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub bot_token: String,
    pub webhook_url: String,
    pub drop_pending_updates: bool,
    pub registration: RegistrationPolicy,
    pub telegram_api_base: Option<String>,
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub llm_base_url: Option<String>,
    pub telegram_timeout: Duration,
    pub llm_timeout: Duration,
}

/// Source of environment values. Tests pass a closure instead of touching the process env.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from `std::env`.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Trimmed, non-empty value or None.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    /// Merge the process environment over this config and validate it.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        self.resolve_with(&ProcessEnv)
    }

    /// Merge `env` over this config and validate it. Every missing secret is reported at once.
    pub fn resolve_with(&self, env: &dyn EnvSource) -> Result<Settings, ConfigError> {
        let provider_name = non_empty(env.var("LLM_PROVIDER"))
            .or_else(|| non_empty(self.llm.provider.clone()));
        let provider = match provider_name {
            Some(name) => {
                ProviderKind::parse(&name).ok_or(ConfigError::UnknownProvider(name))?
            }
            None => ProviderKind::default(),
        };

        let bot_token = non_empty(env.var("TELEGRAM_TOKEN"))
            .or_else(|| non_empty(env.var("TELEGRAM_BOT_TOKEN")))
            .or_else(|| non_empty(self.telegram.bot_token.clone()));
        let api_key = non_empty(env.var(provider.api_key_var()))
            .or_else(|| non_empty(self.llm.api_key.clone()));
        let webhook_url = non_empty(env.var("WEBHOOK_URL"))
            .or_else(|| non_empty(self.telegram.webhook_url.clone()));

        let mut missing = Vec::new();
        if bot_token.is_none() {
            missing.push("TELEGRAM_TOKEN");
        }
        if api_key.is_none() {
            missing.push(provider.api_key_var());
        }
        if webhook_url.is_none() {
            missing.push("WEBHOOK_URL");
        }
        let (Some(bot_token), Some(api_key), Some(webhook_url)) = (bot_token, api_key, webhook_url)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let port = match non_empty(env.var("PORT")) {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: p,
            })?,
            None => self.server.port,
        };
        let bind = non_empty(env.var("BIND")).unwrap_or_else(|| self.server.bind.clone());
        let model = non_empty(env.var("LLM_MODEL"))
            .or_else(|| non_empty(self.llm.model.clone()))
            .unwrap_or_else(|| provider.default_model().to_string());
        let base_var = match provider {
            ProviderKind::Gemini => "GEMINI_API_BASE",
            ProviderKind::Openai => "OPENAI_API_BASE",
        };
        let llm_base_url = non_empty(env.var(base_var)).or_else(|| non_empty(self.llm.base_url.clone()));
        let telegram_api_base = non_empty(env.var("TELEGRAM_API_BASE"))
            .or_else(|| non_empty(self.telegram.api_base.clone()));

        Ok(Settings {
            bind,
            port,
            bot_token,
            webhook_url,
            drop_pending_updates: self.telegram.drop_pending_updates,
            registration: self.telegram.registration,
            telegram_api_base,
            provider,
            model,
            api_key,
            llm_base_url,
            telegram_timeout: Duration::from_secs(self.http.telegram_timeout_secs),
            llm_timeout: Duration::from_secs(self.http.llm_timeout_secs),
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TGRELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".tgrelay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or TGRELAY_CONFIG_PATH). Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn full_env() -> impl Fn(&str) -> Option<String> {
        env(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("GOOGLE_API_KEY", "g-key"),
            ("WEBHOOK_URL", "https://relay.example/webhook"),
        ])
    }

    #[test]
    fn defaults_when_config_empty() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert!(config.telegram.drop_pending_updates);
        assert_eq!(config.telegram.registration, RegistrationPolicy::Required);
        assert_eq!(config.http.telegram_timeout_secs, 15);
        assert_eq!(config.http.llm_timeout_secs, 60);
    }

    #[test]
    fn resolve_reads_required_env() {
        let settings = Config::default().resolve_with(&full_env()).unwrap();
        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.api_key, "g-key");
        assert_eq!(settings.webhook_url, "https://relay.example/webhook");
        assert_eq!(settings.provider, ProviderKind::Gemini);
        assert_eq!(settings.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.llm_timeout, Duration::from_secs(60));
    }

    #[test]
    fn resolve_reports_every_missing_secret() {
        let err = Config::default().resolve_with(&env(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["TELEGRAM_TOKEN", "GOOGLE_API_KEY", "WEBHOOK_URL"])
        );
        assert!(err.to_string().contains("WEBHOOK_URL"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Config::default()
            .resolve_with(&env(&[
                ("TELEGRAM_TOKEN", "  "),
                ("GOOGLE_API_KEY", "g-key"),
                ("WEBHOOK_URL", "https://relay.example/webhook"),
            ]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["TELEGRAM_TOKEN"]));
    }

    #[test]
    fn openai_provider_uses_its_own_key() {
        let err = Config::default()
            .resolve_with(&env(&[
                ("LLM_PROVIDER", "OpenAI"),
                ("TELEGRAM_TOKEN", "t"),
                ("GOOGLE_API_KEY", "g-key"),
                ("WEBHOOK_URL", "https://relay.example/webhook"),
            ]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["OPENAI_API_KEY"]));

        let settings = Config::default()
            .resolve_with(&env(&[
                ("LLM_PROVIDER", "openai"),
                ("TELEGRAM_TOKEN", "t"),
                ("OPENAI_API_KEY", "sk-test"),
                ("WEBHOOK_URL", "https://relay.example/webhook"),
            ]))
            .unwrap();
        assert_eq!(settings.provider, ProviderKind::Openai);
        assert_eq!(settings.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(settings.api_key, "sk-test");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = Config::default()
            .resolve_with(&env(&[("LLM_PROVIDER", "claude")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("claude".to_string()));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.telegram.bot_token = Some("file-token".to_string());
        config.telegram.webhook_url = Some("https://file.example/webhook".to_string());
        config.llm.api_key = Some("file-key".to_string());
        config.llm.model = Some("gemini-1.5-pro".to_string());
        config.server.port = 9000;

        let settings = config
            .resolve_with(&env(&[("TELEGRAM_TOKEN", "env-token"), ("PORT", "8443")]))
            .unwrap();
        assert_eq!(settings.bot_token, "env-token");
        assert_eq!(settings.webhook_url, "https://file.example/webhook");
        assert_eq!(settings.api_key, "file-key");
        assert_eq!(settings.model, "gemini-1.5-pro");
        assert_eq!(settings.port, 8443);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut vars = vec![
            ("TELEGRAM_TOKEN", "t"),
            ("GOOGLE_API_KEY", "k"),
            ("WEBHOOK_URL", "https://relay.example/webhook"),
        ];
        vars.push(("PORT", "eighty"));
        let err = Config::default().resolve_with(&env(&vars)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn parses_camel_case_config_file() {
        let config: Config = serde_json::from_str(
            r#"{
                "server": { "port": 8080 },
                "telegram": { "registration": "bestEffort", "dropPendingUpdates": false },
                "llm": { "provider": "openai", "model": "gpt-4o" },
                "http": { "llmTimeoutSecs": 120 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.telegram.registration, RegistrationPolicy::BestEffort);
        assert!(!config.telegram.drop_pending_updates);
        assert_eq!(config.llm.provider.as_deref(), Some("openai"));
        assert_eq!(config.http.llm_timeout_secs, 120);
        assert_eq!(config.http.telegram_timeout_secs, 15);
    }

    #[test]
    fn registration_keys_live_under_telegram() {
        let config: Config = serde_json::from_str(
            r#"{ "telegram": { "dropPendingUpdates": false, "registration": "bestEffort" } }"#,
        )
        .unwrap();
        assert!(!config.telegram.drop_pending_updates);
        assert_eq!(config.telegram.registration, RegistrationPolicy::BestEffort);

        let settings = config
            .resolve_with(&full_env())
            .unwrap();
        assert!(!settings.drop_pending_updates);
        assert_eq!(settings.registration, RegistrationPolicy::BestEffort);
    }

    #[test]
    fn misplaced_keys_are_rejected() {
        let top = serde_json::from_str::<Config>(r#"{ "webhook": { "registration": "bestEffort" } }"#);
        assert!(top.unwrap_err().to_string().contains("webhook"));

        let nested = serde_json::from_str::<Config>(r#"{ "telegram": { "registraton": "bestEffort" } }"#);
        assert!(nested.unwrap_err().to_string().contains("registraton"));
    }

    #[test]
    fn load_config_reports_unknown_keys_with_path() {
        let path = std::env::temp_dir().join(format!("tgrelay-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "webhook": { "registration": "bestEffort" } }"#).unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(format!("{:#}", err).contains("parsing config from"));
    }

    #[test]
    fn load_config_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("tgrelay-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.server.port, 8000);
    }
}
