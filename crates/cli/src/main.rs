use anyhow::Context;
use clap::{Parser, Subcommand};
use relay::channels::{HttpTelegramApi, TelegramApi};
use relay::config::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tgrelay")]
#[command(about = "Relay Telegram messages to an LLM and send back its replies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Register the webhook and serve the relay. Requires TELEGRAM_TOKEN, WEBHOOK_URL and the provider API key (GOOGLE_API_KEY or OPENAI_API_KEY).
    Serve {
        /// Config file path (default: TGRELAY_CONFIG_PATH or ~/.tgrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default: PORT env, config, or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Delete and re-set the Telegram webhook once, then exit.
    Register {
        /// Config file path (default: TGRELAY_CONFIG_PATH or ~/.tgrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Send one prompt to the configured provider and print the reply.
    Ask {
        /// Config file path (default: TGRELAY_CONFIG_PATH or ~/.tgrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Prompt text
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("tgrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Register { config }) => {
            if let Err(e) = run_register(config).await {
                log::error!("register failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, prompt }) => {
            if let Err(e) = run_ask(config, &prompt).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Load the config file and merge the environment over it. Missing secrets are fatal.
fn load_settings(config_path: Option<PathBuf>) -> anyhow::Result<Settings> {
    let (config, path) = relay::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    Ok(config.resolve()?)
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut settings = load_settings(config_path)?;
    if let Some(p) = port {
        settings.port = p;
    }
    log::info!("starting relay on {}:{}", settings.bind, settings.port);
    relay::gateway::run_server(settings).await
}

async fn run_register(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let telegram = HttpTelegramApi::new(
        settings.bot_token.clone(),
        settings.telegram_api_base.clone(),
        settings.telegram_timeout,
    )?;
    telegram
        .register_webhook(&settings.webhook_url, settings.drop_pending_updates)
        .await
        .with_context(|| format!("registering webhook {}", settings.webhook_url))?;
    println!("webhook set to {}", settings.webhook_url);
    Ok(())
}

async fn run_ask(config_path: Option<PathBuf>, prompt: &str) -> anyhow::Result<()> {
    let settings = load_settings(config_path)?;
    let provider = relay::llm::build_provider(&settings)?;
    let reply = provider.complete(prompt).await?;
    println!("{}", reply.trim());
    Ok(())
}
