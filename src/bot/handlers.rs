//! Update handlers: commands, links, stickers and picker buttons.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{FileId, Sticker};
use tracing::{error, info, warn};

use super::messages;
use super::relay::relay_media;
use super::sessions::{parse_pick, pick_keyboard, Selection};
use super::{BotState, Command};
use crate::cobalt::{self, PickerItem, Resolution, EMPTY_FETCH_CODE};
use crate::download::picker_filename;
use crate::picker::build_preview;
use crate::request::parse_request;
use crate::sticker::{convert_to_png, sticker_filename, StickerKind};

pub async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => messages::WELCOME,
        Command::Help => messages::HELP,
        Command::Supported => messages::SUPPORTED,
        Command::Credits => messages::CREDITS,
    };
    let _ = state.telegram.send_markdown(msg.chat.id, text).await;
    Ok(())
}

pub async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(sticker) = msg.sticker() {
        info!("🖼️ Sticker from chat {}", msg.chat.id);
        handle_sticker(&state, msg.chat.id, sticker).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    handle_link(&state, msg.chat.id, text).await;
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(label) = q.data.as_deref().and_then(parse_pick) else {
        state.telegram.answer_callback(&q, None).await;
        return Ok(());
    };
    let Some(ref message) = q.message else {
        state.telegram.answer_callback(&q, Some(messages::PICKER_EXPIRED)).await;
        return Ok(());
    };
    let chat_id = message.chat().id;

    match state.sessions.select(chat_id, message.id(), label).await {
        Selection::Item(item) => {
            state.telegram.answer_callback(&q, None).await;
            info!("Picker choice {} in chat {}: {}", label, chat_id, item.url);
            let filename = picker_filename(&item.url, item.kind.as_deref());
            relay_media(&state, chat_id, &item.url, &filename, item.kind.as_deref()).await;
        }
        Selection::Expired => {
            state.telegram.answer_callback(&q, Some(messages::PICKER_EXPIRED)).await;
        }
        Selection::Invalid => {
            state.telegram.answer_callback(&q, Some(messages::PICKER_INVALID)).await;
        }
    }
    Ok(())
}

async fn handle_link(state: &BotState, chat_id: ChatId, text: &str) {
    let request = match parse_request(text) {
        Ok(request) => request,
        Err(_) => {
            let _ = state.telegram.send_message(chat_id, messages::INVALID_LINK).await;
            return;
        }
    };

    let _ = state.telegram.send_message(chat_id, messages::RESOLVING).await;

    match state.cobalt.resolve(&request).await {
        Ok(Resolution::Media(media)) => {
            relay_media(state, chat_id, &media.url, &media.filename, None).await;
        }
        Ok(Resolution::Picker(items)) => {
            offer_picker(state, chat_id, items).await;
        }
        Err(cobalt::Error::Rejected(code)) => {
            info!("Cobalt rejected {}: {}", request.url, code);
            let text = if code == EMPTY_FETCH_CODE {
                messages::EMPTY_FETCH.to_string()
            } else {
                messages::rejected(&code)
            };
            let _ = state.telegram.send_message(chat_id, &text).await;
        }
        Err(e) => {
            error!("Failed to resolve {}: {e}", request.url);
            let _ = state.telegram.send_message(chat_id, messages::PROCESSING_ERROR).await;
        }
    }
}

/// Send a numbered preview of the choices and remember them for the buttons.
async fn offer_picker(state: &BotState, chat_id: ChatId, items: Vec<PickerItem>) {
    if !state.config.picker_enabled || items.is_empty() {
        let _ = state.telegram.send_message(chat_id, messages::PICKER_UNSUPPORTED).await;
        return;
    }

    let grid = &state.config.grid;
    let preview = match build_preview(&state.http, &items, grid, &state.labels, &state.config.downloads_dir).await {
        Ok(preview) => preview,
        Err(e) => {
            warn!("Failed to build picker preview for {} items: {e}", items.len());
            let _ = state.telegram.send_message(chat_id, messages::PICKER_FAILED).await;
            return;
        }
    };

    let keyboard = pick_keyboard(preview.entries.len(), grid.columns as usize);
    let sent = state
        .telegram
        .send_photo(chat_id, &preview.path, Some(messages::PICKER_CAPTION), Some(keyboard))
        .await;

    if let Err(e) = tokio::fs::remove_file(&preview.path).await {
        warn!("Failed to remove preview {}: {e}", preview.path.display());
    }

    match sent {
        Ok(message_id) => {
            let choices = preview.labelled_items(&items);
            info!("Offered {} choices in chat {}", choices.len(), chat_id);
            state.sessions.insert(chat_id, message_id, choices).await;
        }
        Err(_) => {
            let _ = state.telegram.send_message(chat_id, messages::PICKER_FAILED).await;
        }
    }
}

async fn handle_sticker(state: &BotState, chat_id: ChatId, sticker: &Sticker) {
    let _ = state.telegram.send_message(chat_id, messages::ANALYZING).await;

    let kind = StickerKind::classify(sticker.is_animated(), sticker.is_video());
    if kind == StickerKind::Animated {
        let _ = state.telegram.send_message(chat_id, messages::ANIMATED_STICKER).await;
        return;
    }

    if let Err(e) = relay_sticker(state, chat_id, sticker.file.id.clone(), kind).await {
        error!("Sticker relay failed: {e}");
        let _ = state.telegram.send_message(chat_id, messages::STICKER_ERROR).await;
    }
}

async fn relay_sticker(state: &BotState, chat_id: ChatId, file_id: FileId, kind: StickerKind) -> Result<(), String> {
    let (data, remote_path) = state.telegram.download(file_id.clone()).await?;

    let (bytes, filename) = match kind {
        StickerKind::Static => {
            let png = tokio::task::spawn_blocking(move || convert_to_png(&data))
                .await
                .map_err(|e| format!("Conversion task failed: {e}"))?
                .map_err(|e| e.to_string())?;
            (png, sticker_filename(&file_id.0, "png"))
        }
        _ => {
            let ext = remote_path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("webm");
            (data, sticker_filename(&file_id.0, ext))
        }
    };

    let work_dir = state
        .config
        .downloads_dir
        .join(uuid::Uuid::new_v4().simple().to_string());
    let path = work_dir.join(filename);

    let result = async {
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| format!("Failed to create {}: {e}", work_dir.display()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        state
            .telegram
            .send_document(chat_id, &path)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
    .await;

    if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to clean up {}: {e}", work_dir.display());
        }
    }
    result
}
