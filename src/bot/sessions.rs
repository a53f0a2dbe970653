//! Pending picker selections, keyed by the preview message they belong to.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cobalt::PickerItem;

const CALLBACK_PREFIX: &str = "pick:";

/// Items a user can choose from, in label order (label 1 is `items[0]`).
struct PickerSession {
    items: Vec<PickerItem>,
    created: Instant,
}

pub enum Selection {
    Item(PickerItem),
    /// No session for this message (expired, already used, or restarted).
    Expired,
    /// Session exists but the label is out of range.
    Invalid,
}

pub struct PickerSessions {
    sessions: Mutex<HashMap<(ChatId, MessageId), PickerSession>>,
    ttl: Duration,
}

impl PickerSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Remember the choices offered by preview message `message_id`.
    pub async fn insert(&self, chat_id: ChatId, message_id: MessageId, items: Vec<PickerItem>) {
        let mut sessions = self.sessions.lock().await;
        let ttl = self.ttl;
        sessions.retain(|_, s| s.created.elapsed() < ttl);
        sessions.insert((chat_id, message_id), PickerSession { items, created: Instant::now() });
        debug!("{} picker session(s) pending", sessions.len());
    }

    /// Resolve a button press. A valid selection consumes the session.
    pub async fn select(&self, chat_id: ChatId, message_id: MessageId, label: usize) -> Selection {
        let mut sessions = self.sessions.lock().await;
        let key = (chat_id, message_id);

        let Some(session) = sessions.get(&key) else {
            return Selection::Expired;
        };
        if session.created.elapsed() >= self.ttl {
            sessions.remove(&key);
            return Selection::Expired;
        }
        if label == 0 || label > session.items.len() {
            return Selection::Invalid;
        }
        match sessions.remove(&key) {
            Some(mut session) => Selection::Item(session.items.swap_remove(label - 1)),
            None => Selection::Expired,
        }
    }
}

/// Buttons `1..=count`, `columns` per row, mirroring the grid.
pub fn pick_keyboard(count: usize, columns: usize) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = (1..=count)
        .map(|label| InlineKeyboardButton::callback(label.to_string(), format!("{CALLBACK_PREFIX}{label}")))
        .collect();
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .chunks(columns.max(1))
        .map(|row| row.to_vec())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Parse `pick:<label>` callback data.
pub fn parse_pick(data: &str) -> Option<usize> {
    data.strip_prefix(CALLBACK_PREFIX)?
        .parse()
        .ok()
        .filter(|label| *label > 0)
}
