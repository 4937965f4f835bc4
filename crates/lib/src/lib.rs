//! tgrelay core library — configuration, the Telegram and LLM adapters, the webhook
//! handler, and the HTTP server used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod relay;
