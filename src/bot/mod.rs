//! Bot module - routes Telegram updates to Cobalt and relays the results.

pub mod handlers;
pub mod messages;
pub mod relay;
pub mod sessions;
pub mod telegram;

use std::time::Duration;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::cobalt;
use crate::config::Config;
use crate::picker::LabelRenderer;
use crate::zipline::ZiplineClient;

pub use sessions::PickerSessions;
pub use telegram::TelegramClient;

/// Unanswered picker previews are forgotten after this long.
const PICKER_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Show the welcome message.")]
    Start,
    #[command(description = "Explain option flags.")]
    Help,
    #[command(description = "List supported services.")]
    Supported,
    #[command(description = "Show credits.")]
    Credits,
}

pub struct BotState {
    pub config: Config,
    pub telegram: TelegramClient,
    pub cobalt: cobalt::Client,
    /// Shared client for media, thumbnails and uploads.
    pub http: reqwest::Client,
    pub zipline: Option<ZiplineClient>,
    pub labels: LabelRenderer,
    pub sessions: PickerSessions,
}

impl BotState {
    pub fn new(config: Config, bot: Bot) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .user_agent("cobaltfox")
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        let cobalt = cobalt::Client::new(
            config.cobalt_api_url.clone(),
            config.cobalt_api_key.clone(),
            http.clone(),
        );
        let zipline = config
            .zipline
            .clone()
            .map(|z| ZiplineClient::new(z, http.clone()));
        match zipline {
            Some(ref z) => info!("Zipline fallback enabled ({})", z.host()),
            None => info!("Zipline fallback disabled, oversized files are sent as links"),
        }
        let labels = LabelRenderer::load(config.label_font_path.as_deref())?;

        Ok(Self {
            config,
            telegram: TelegramClient::new(bot),
            cobalt,
            http,
            zipline,
            labels,
            sessions: PickerSessions::new(PICKER_SESSION_TTL),
        })
    }
}

pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
}
