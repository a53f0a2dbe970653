//! Mirrors the bot's own log events into a Telegram chat.
//!
//! Warnings and errors go out as soon as they happen. Info lines are
//! collected and flushed as one message every few seconds.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Telegram rejects texts longer than 4096 characters.
const MAX_LOG_CHARS: usize = 4000;
const FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const MAX_BATCH_LINES: usize = 40;

#[derive(Debug, PartialEq, Eq)]
enum LogEntry {
    Urgent(String),
    Info(String),
}

impl LogEntry {
    fn new(level: Level, message: String) -> Option<Self> {
        match level {
            Level::ERROR => Some(LogEntry::Urgent(format!("❌ {message}"))),
            Level::WARN => Some(LogEntry::Urgent(format!("⚠️ {message}"))),
            Level::INFO => Some(LogEntry::Info(message)),
            _ => None,
        }
    }
}

/// Info lines waiting to be sent.
#[derive(Debug, Default)]
struct InfoBatch {
    lines: Vec<String>,
}

impl InfoBatch {
    /// Adds a line; returns the batch text once it is full.
    fn push(&mut self, line: String) -> Option<String> {
        self.lines.push(line);
        if self.lines.len() >= MAX_BATCH_LINES {
            self.take()
        } else {
            None
        }
    }

    fn take(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let text = self.lines.join("\n");
        self.lines.clear();
        Some(text)
    }
}

fn truncate_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl TelegramLogLayer {
    /// Must be called inside a tokio runtime; the sender task is spawned here.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogEntry>();

        tokio::spawn(async move {
            let mut batch = InfoBatch::default();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    entry = rx.recv() => match entry {
                        Some(LogEntry::Urgent(text)) => send_log(&bot, chat_id, &text).await,
                        Some(LogEntry::Info(text)) => {
                            if let Some(full) = batch.push(text) {
                                send_log(&bot, chat_id, &full).await;
                            }
                        }
                        None => break,
                    },
                    _ = interval.tick() => {
                        if let Some(text) = batch.take() {
                            send_log(&bot, chat_id, &text).await;
                        }
                    }
                }
            }
        });

        Self { tx }
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    let text = truncate_log(text, MAX_LOG_CHARS);
    if let Err(e) = bot.send_message(chat_id, text).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else if self.message.is_empty() {
            self.message = format!("{} = {value:?}", field.name());
        } else {
            self.message.push_str(&format!(", {} = {value:?}", field.name()));
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Sending a log produces teloxide/reqwest events of its own.
        if !event.metadata().target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let Some(entry) = LogEntry::new(*event.metadata().level(), visitor.message) else {
            return;
        };
        if self.tx.send(entry).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
