//! Telegram client using teloxide.

use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, MessageId, ParseMode};
use tracing::{info, warn};

/// Telegram rejects uploads above its size limit with this description.
const ENTITY_TOO_LARGE: &str = "request entity too large";

#[derive(Debug)]
pub enum SendError {
    /// The file is above what Telegram accepts from bots.
    TooLarge,
    Other(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::TooLarge => write!(f, "file too large for Telegram"),
            SendError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SendError {}

fn classify(what: &str, e: teloxide::RequestError) -> SendError {
    let text = e.to_string();
    if text.to_lowercase().contains(ENTITY_TOO_LARGE) {
        warn!("Failed to send {what}: Telegram refused it as too large");
        SendError::TooLarge
    } else {
        let msg = format!("Failed to send {what}: {text}");
        warn!("{}", msg);
        SendError::Other(msg)
    }
}

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId, String> {
        self.bot
            .send_message(chat_id, text)
            .await
            .map(|msg| msg.id)
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    pub async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageId, String> {
        self.bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map(|msg| msg.id)
            .map_err(|e| {
                let msg = format!("Failed to send markdown: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Send a local image file as a photo, optionally with buttons.
    pub async fn send_photo(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: Option<&str>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, SendError> {
        info!("📷 Sending photo {} to chat {}", path.display(), chat_id);

        let mut request = self.bot.send_photo(chat_id, InputFile::file(path.to_path_buf()));
        if let Some(cap) = caption {
            request = request.caption(cap);
        }
        if let Some(markup) = keyboard {
            request = request.reply_markup(markup);
        }

        request.await.map(|msg| msg.id).map_err(|e| classify("photo", e))
    }

    /// Send a local file as a document.
    pub async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<MessageId, SendError> {
        info!("📎 Sending document {} to chat {}", path.display(), chat_id);

        self.bot
            .send_document(chat_id, InputFile::file(path.to_path_buf()))
            .await
            .map(|msg| msg.id)
            .map_err(|e| classify("document", e))
    }

    /// Download a file by id. Returns (bytes, Telegram-side file path).
    pub async fn download(&self, file_id: FileId) -> Result<(Vec<u8>, String), String> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;

        info!("📥 Downloaded {} ({} bytes)", file.path, data.len());
        Ok((data, file.path))
    }

    pub async fn answer_callback(&self, query: &CallbackQuery, text: Option<&str>) {
        let mut request = self.bot.answer_callback_query(query.id.clone());
        if let Some(text) = text {
            request = request.text(text);
        }
        if let Err(e) = request.await {
            warn!("Failed to answer callback: {e}");
        }
    }
}
