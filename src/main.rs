use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use cobaltfox::bot::{self, BotState};
use cobaltfox::config::Config;
use cobaltfox::telegram_log::TelegramLogLayer;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cobaltfox.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("cobaltfox.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        registry.with(TelegramLogLayer::new(bot.clone(), log_chat_id)).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting cobaltfox...");
    info!("Loaded config from {config_path}");
    info!("Cobalt API: {}", config.cobalt_api_url);
    if !config.picker_enabled {
        info!("Picker previews disabled");
    }

    let state = match BotState::new(config, bot.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize bot: {e}");
            std::process::exit(1);
        }
    };

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
