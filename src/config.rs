use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

use crate::picker::GridConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Base URL of the Cobalt instance (e.g., "https://cobalt.example.com").
    cobalt_api_url: String,
    #[serde(default)]
    cobalt_api_key: String,
    /// Zipline instance used for files above the Telegram upload limit.
    zipline: Option<ZiplineFile>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
    /// Working directory for downloads. Defaults to `<data_dir>/downloads`.
    downloads_dir: Option<String>,
    #[serde(default = "default_upload_limit_mb")]
    upload_limit_mb: u64,
    log_chat_id: Option<i64>,
    #[serde(default)]
    picker: PickerFile,
    /// TTF/OTF font used for grid labels. Built-in digits are used if unset.
    label_font_path: Option<String>,
}

#[derive(Deserialize)]
struct ZiplineFile {
    url: String,
    token: String,
    folder: Option<String>,
    #[serde(default = "default_expires_at")]
    expires_at: String,
}

#[derive(Deserialize)]
#[serde(default)]
struct PickerFile {
    enabled: bool,
    columns: u32,
    cell_size: u32,
    spacing: u32,
    label_height: u32,
    background: [u8; 3],
    fetch_timeout_secs: u64,
    max_concurrent_fetches: usize,
}

impl Default for PickerFile {
    fn default() -> Self {
        let grid = GridConfig::default();
        Self {
            enabled: true,
            columns: grid.columns,
            cell_size: grid.cell_size,
            spacing: grid.spacing,
            label_height: grid.label_height,
            background: grid.background,
            fetch_timeout_secs: grid.fetch_timeout.as_secs(),
            max_concurrent_fetches: grid.max_concurrent_fetches,
        }
    }
}

fn default_upload_limit_mb() -> u64 {
    50
}

fn default_expires_at() -> String {
    "1h".to_string()
}

/// Zipline upload settings.
#[derive(Debug, Clone)]
pub struct ZiplineConfig {
    pub url: String,
    pub token: String,
    pub folder: Option<String>,
    pub expires_at: String,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub cobalt_api_url: String,
    pub cobalt_api_key: String,
    pub zipline: Option<ZiplineConfig>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    pub downloads_dir: PathBuf,
    /// Largest file the bot will send through Telegram.
    pub upload_limit_bytes: u64,
    pub log_chat_id: Option<ChatId>,
    pub picker_enabled: bool,
    pub grid: GridConfig,
    pub label_font_path: Option<PathBuf>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if !file.cobalt_api_url.starts_with("http") {
            return Err(ConfigError::Validation("cobalt_api_url must be an http(s) URL".into()));
        }
        if file.upload_limit_mb == 0 {
            return Err(ConfigError::Validation("upload_limit_mb must be positive".into()));
        }

        let picker = file.picker;
        if picker.columns == 0 || picker.cell_size == 0 {
            return Err(ConfigError::Validation("picker columns and cell_size must be positive".into()));
        }
        if picker.max_concurrent_fetches == 0 {
            return Err(ConfigError::Validation("picker max_concurrent_fetches must be positive".into()));
        }
        if picker.fetch_timeout_secs == 0 {
            return Err(ConfigError::Validation("picker fetch_timeout_secs must be positive".into()));
        }
        if picker.label_height > picker.cell_size {
            return Err(ConfigError::Validation("picker label_height cannot exceed cell_size".into()));
        }

        let zipline = match file.zipline {
            Some(z) if z.url.is_empty() || z.token.is_empty() => {
                return Err(ConfigError::Validation("zipline requires both url and token".into()));
            }
            Some(z) => Some(ZiplineConfig {
                url: z.url.trim_end_matches('/').to_string(),
                token: z.token,
                folder: z.folder,
                expires_at: z.expires_at,
            }),
            None => None,
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let downloads_dir = file
            .downloads_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("downloads"));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            cobalt_api_url: file.cobalt_api_url,
            cobalt_api_key: file.cobalt_api_key,
            zipline,
            data_dir,
            downloads_dir,
            upload_limit_bytes: file.upload_limit_mb * 1024 * 1024,
            log_chat_id: file.log_chat_id.map(ChatId),
            picker_enabled: picker.enabled,
            grid: GridConfig {
                columns: picker.columns,
                cell_size: picker.cell_size,
                spacing: picker.spacing,
                label_height: picker.label_height,
                background: picker.background,
                fetch_timeout: Duration::from_secs(picker.fetch_timeout_secs),
                max_concurrent_fetches: picker.max_concurrent_fetches,
            },
            label_font_path: file.label_font_path.map(PathBuf::from),
        })
    }
}
