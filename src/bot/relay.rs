//! Media relay: download what Cobalt resolved and get it to the user.

use std::path::Path;

use teloxide::types::ChatId;
use tracing::{error, warn};

use super::BotState;
use super::messages;
use super::telegram::SendError;
use crate::download::{download_to, sanitize_filename, DownloadError, Downloaded};
use crate::zipline::ZiplineError;

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug)]
pub enum RelayError {
    Download(DownloadError),
    Upload(ZiplineError),
    Send(SendError),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Download(e) => write!(f, "download failed: {e}"),
            RelayError::Upload(e) => write!(f, "upload failed: {e}"),
            RelayError::Send(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<DownloadError> for RelayError {
    fn from(e: DownloadError) -> Self {
        RelayError::Download(e)
    }
}

impl From<ZiplineError> for RelayError {
    fn from(e: ZiplineError) -> Self {
        RelayError::Upload(e)
    }
}

impl From<SendError> for RelayError {
    fn from(e: SendError) -> Self {
        RelayError::Send(e)
    }
}

/// What to do with a finished (or refused) download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Too large to handle; reply with the direct media link.
    Link,
    /// Too large for Telegram; hand it to Zipline.
    Upload,
    /// Send through Telegram, as a photo first when `photo_first`, then
    /// always as a document.
    Send { photo_first: bool },
}

pub fn plan(downloaded: &Downloaded, limit: u64, has_zipline: bool, as_photo: bool) -> Delivery {
    match *downloaded {
        Downloaded::TooLarge { .. } => Delivery::Link,
        Downloaded::File { size, .. } if size > limit => {
            if has_zipline {
                Delivery::Upload
            } else {
                Delivery::Link
            }
        }
        Downloaded::File { .. } => Delivery::Send { photo_first: as_photo },
    }
}

/// Reply for a failed relay.
pub fn failure_reply(err: &RelayError) -> &'static str {
    match err {
        RelayError::Send(SendError::TooLarge) => messages::TELEGRAM_TOO_LARGE,
        _ => messages::LINK_ERROR,
    }
}

/// Whether the media should also be shown inline as a photo.
pub fn is_photo(kind: Option<&str>, filename: &str) -> bool {
    if kind == Some("photo") {
        return true;
    }
    filename
        .rsplit_once('.')
        .map(|(_, ext)| PHOTO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Download `url` and deliver it to `chat_id`, replying on failure.
///
/// Each relay works in its own directory under the downloads dir, which is
/// removed afterwards whatever happened.
pub async fn relay_media(state: &BotState, chat_id: ChatId, url: &str, filename: &str, kind: Option<&str>) {
    let _ = state.telegram.send_message(chat_id, messages::DOWNLOADING).await;

    let work_dir = state
        .config
        .downloads_dir
        .join(uuid::Uuid::new_v4().simple().to_string());
    let dest = work_dir.join(sanitize_filename(filename));

    if let Err(e) = deliver(state, chat_id, url, &dest, is_photo(kind, filename)).await {
        error!("Relay of {} failed: {e}", url);
        let _ = state.telegram.send_message(chat_id, failure_reply(&e)).await;
    }

    if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to clean up {}: {e}", work_dir.display());
        }
    }
}

async fn deliver(
    state: &BotState,
    chat_id: ChatId,
    url: &str,
    dest: &Path,
    as_photo: bool,
) -> Result<(), RelayError> {
    let limit = state.config.upload_limit_bytes;
    let limit_mb = limit / (1024 * 1024);

    let downloaded = download_to(&state.http, url, dest, limit).await?;

    match (plan(&downloaded, limit, state.zipline.is_some(), as_photo), &state.zipline) {
        (Delivery::Upload, Some(zipline)) => {
            let _ = state
                .telegram
                .send_message(chat_id, &messages::uploading(zipline.host(), limit_mb))
                .await;
            let link = zipline.upload(dest).await?;
            let _ = state
                .telegram
                .send_message(chat_id, &messages::uploaded(&link, zipline.expires_at()))
                .await;
        }
        (Delivery::Send { photo_first }, _) => {
            let _ = state.telegram.send_message(chat_id, messages::SENDING).await;
            if photo_first {
                if let Err(e) = state.telegram.send_photo(chat_id, dest, None, None).await {
                    warn!("Photo preview failed, sending as document only: {e}");
                }
            }
            state.telegram.send_document(chat_id, dest).await?;
        }
        _ => {
            for text in messages::too_large_link(url, limit_mb) {
                let _ = state.telegram.send_message(chat_id, &text).await;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    const LIMIT: u64 = 50 * 1024 * 1024;

    fn file(size: u64) -> Downloaded {
        Downloaded::File { path: PathBuf::from("/tmp/x/media.mp4"), size }
    }

    #[test]
    fn test_plan_refused_download_is_link() {
        let refused = Downloaded::TooLarge { size: LIMIT + 1 };
        assert_eq!(plan(&refused, LIMIT, true, false), Delivery::Link);
        assert_eq!(plan(&refused, LIMIT, false, true), Delivery::Link);
    }

    #[test]
    fn test_plan_oversized_file() {
        assert_eq!(plan(&file(LIMIT + 1), LIMIT, false, false), Delivery::Link);
        assert_eq!(plan(&file(LIMIT + 1), LIMIT, true, false), Delivery::Upload);
    }

    #[test]
    fn test_plan_within_limit_sends() {
        assert_eq!(plan(&file(LIMIT), LIMIT, true, false), Delivery::Send { photo_first: false });
        assert_eq!(plan(&file(1024), LIMIT, false, true), Delivery::Send { photo_first: true });
    }

    #[test]
    fn test_failure_replies() {
        assert_eq!(failure_reply(&RelayError::Send(SendError::TooLarge)), messages::TELEGRAM_TOO_LARGE);
        assert_eq!(failure_reply(&RelayError::Send(SendError::Other("bad".into()))), messages::LINK_ERROR);
        assert_eq!(failure_reply(&RelayError::Download(DownloadError::Status(404))), messages::LINK_ERROR);
    }

    #[test]
    fn test_photo_by_kind() {
        assert!(is_photo(Some("photo"), "tunnel"));
        assert!(!is_photo(Some("video"), "clip.mp4"));
    }

    #[test]
    fn test_photo_by_extension() {
        assert!(is_photo(None, "pic.jpg"));
        assert!(is_photo(None, "pic.JPEG"));
        assert!(is_photo(None, "pic.png"));
        assert!(is_photo(None, "pic.webp"));
        assert!(!is_photo(None, "song.mp3"));
        assert!(!is_photo(None, "jpg"));
    }
}
