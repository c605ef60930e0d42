//! bidrelay - Telegram load-bid relay daemon
//!
//! # Usage
//!
//! ```bash
//! cargo run --release
//! ```
//!
//! # Environment Variables
//!
//! | Variable                                   | Required | Description                          |
//! |--------------------------------------------|----------|--------------------------------------|
//! | `TELEGRAM_BOT_TOKEN` / `BOT_TOKEN`         | Yes      | Bot credentials                      |
//! | `TELEGRAM_SOURCE_CHAT_ID` / `SOURCE_CHANNEL_ID` | Yes | Channel the bot listens to           |
//! | `TELEGRAM_TARGET_GROUP_ID` / `TARGET_GROUP_ID` | Yes  | Chat posts are copied into           |
//! | `DATABASE_URL`                             | No       | Postgres URL; unset disables upserts |
//! | `WEBHOOK_URL`                              | No       | Notification webhook                 |
//! | `WEBHOOK_API_KEY`                          | No       | Shared secret for the webhook        |
//! | `RUST_LOG`                                 | No       | Logging level (default: info)        |

use anyhow::Result;
use bidrelay::{BidStore, Pipeline, RelayConfig, SharedState, TelegramClient};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bidrelay", about = "Telegram load-bid relay and ingestion daemon")]
#[command(version)]
struct CliArgs {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Source channel id the bot listens to
    #[arg(long)]
    source_chat_id: Option<i64>,

    /// Destination chat id posts are copied into
    #[arg(long)]
    target_chat_id: Option<i64>,

    /// PostgreSQL connection URL (unset disables persistence)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Notification webhook URL (unset disables notifications)
    #[arg(long)]
    webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,bidrelay=debug")),
        )
        .init();

    let args = CliArgs::parse();

    // Fails here, before the pipeline starts, when required credentials or
    // chat ids are missing.
    let config = RelayConfig::from_env(
        args.bot_token,
        args.source_chat_id,
        args.target_chat_id,
        args.database_url,
        args.webhook_url,
    )?;

    info!(
        source = config.source_chat_id,
        target = config.target_chat_id,
        postgres = config.postgres_enabled(),
        webhook = config.webhook_url.is_some(),
        "Starting bidrelay"
    );

    // ── Store preflight ──────────────────────────────────────────────────────
    let store = match &config.database_url {
        Some(url) => {
            let store = BidStore::connect(url).await?;
            store.run_migrations().await?;
            store.preflight().await?;
            Some(store)
        }
        None => {
            info!("DATABASE_URL not set — persistence disabled");
            None
        }
    };

    let notifier = config
        .webhook_url
        .as_deref()
        .map(|url| bidrelay::notify::Notifier::new(url, config.webhook_api_key.as_deref()));

    // ── Transport ────────────────────────────────────────────────────────────
    let telegram = Arc::new(TelegramClient::new(&config.bot_token));
    let username = telegram.get_me().await?;
    telegram.drop_pending_updates().await?;
    info!(bot = %username, "Bot API connection verified");

    let state = SharedState::new();
    state.set_connected(true);
    state.push_event("Polling started");

    let pipeline = Pipeline::new(
        Arc::clone(&telegram),
        store,
        notifier,
        state.clone(),
        config.source_chat_id,
        config.target_chat_id,
    );

    // ── Poll loop with graceful shutdown ─────────────────────────────────────
    // Cancellation stops intake of new updates; the in-flight message always
    // finishes its write before exit.
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    loop {
        let updates = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = telegram.next_updates() => match result {
                Ok(updates) => updates,
                Err(e) => {
                    state.set_error(format!("Poll failed: {e}"));
                    warn!(error = %e, "getUpdates failed — retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                    continue;
                }
            },
        };

        for msg in &updates {
            pipeline.handle_message(msg).await;
        }
    }

    state.set_connected(false);
    info!("bidrelay shut down gracefully");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });
}
