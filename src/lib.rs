//! Cobalt Fox: a Telegram front end for the Cobalt media API.

pub mod bot;
pub mod cobalt;
pub mod config;
pub mod download;
pub mod picker;
pub mod request;
pub mod sticker;
pub mod telegram_log;
pub mod zipline;
