//! Thumbnail fetcher: downloads picker thumbnails and normalizes them to
//! square cells.

use std::fmt;

use futures_util::future::join_all;
use futures_util::StreamExt;
use image::imageops::FilterType;
use image::RgbaImage;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::grid::GridConfig;
use crate::cobalt::PickerItem;

/// Thumbnails are small; anything bigger than this is not one.
const MAX_THUMBNAIL_BYTES: u64 = 4 * 1024 * 1024;

/// Why a single thumbnail was dropped from the grid.
#[derive(Debug)]
pub enum FetchError {
    MissingThumbnail,
    Http(String),
    Status(u16),
    Timeout,
    TooLarge(u64),
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::MissingThumbnail => write!(f, "item has no thumbnail"),
            FetchError::Http(e) => write!(f, "HTTP error: {e}"),
            FetchError::Status(code) => write!(f, "unexpected status {code}"),
            FetchError::Timeout => write!(f, "timed out"),
            FetchError::TooLarge(size) => write!(f, "body of {size} bytes exceeds {MAX_THUMBNAIL_BYTES}"),
            FetchError::Decode(e) => write!(f, "not a decodable image: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Fetch every item's thumbnail.
///
/// The result has the same length and order as `items`; failed positions
/// are `None`. At most `max_concurrent_fetches` requests are in flight and
/// each is bounded by `fetch_timeout`. Returns once every fetch settled.
pub async fn fetch_thumbnails(
    client: &reqwest::Client,
    items: &[PickerItem],
    config: &GridConfig,
) -> Vec<Option<RgbaImage>> {
    let permits = Semaphore::new(config.max_concurrent_fetches.max(1));

    let fetches = items.iter().map(|item| {
        let permits = &permits;
        async move {
            let _permit = permits.acquire().await.ok()?;
            let reference = item.thumb.as_deref().unwrap_or("<none>");
            match fetch_one(client, item, config).await {
                Ok(thumb) => {
                    debug!("Fetched thumbnail {reference}");
                    Some(thumb)
                }
                Err(e) => {
                    warn!("Failed to process thumbnail {reference}: {e}");
                    None
                }
            }
        }
    });

    join_all(fetches).await
}

async fn fetch_one(
    client: &reqwest::Client,
    item: &PickerItem,
    config: &GridConfig,
) -> Result<RgbaImage, FetchError> {
    let url = item.thumb.as_deref().ok_or(FetchError::MissingThumbnail)?;

    let download = async {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        if let Some(len) = response.content_length().filter(|&len| len > MAX_THUMBNAIL_BYTES) {
            return Err(FetchError::TooLarge(len));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Http(e.to_string()))?;
            body.extend_from_slice(&chunk);
            if body.len() as u64 > MAX_THUMBNAIL_BYTES {
                return Err(FetchError::TooLarge(body.len() as u64));
            }
        }
        Ok(body)
    };

    let bytes = tokio::time::timeout(config.fetch_timeout, download)
        .await
        .map_err(|_| FetchError::Timeout)??;

    let size = config.cell_size;
    tokio::task::spawn_blocking(move || normalize_thumbnail(&bytes, size))
        .await
        .map_err(|e| FetchError::Decode(format!("decode task failed: {e}")))?
}

/// Decode `bytes` and hard-resize to `size` x `size`, ignoring aspect ratio.
pub fn normalize_thumbnail(bytes: &[u8], size: u32) -> Result<RgbaImage, FetchError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(decoded.resize_exact(size, size, FilterType::Triangle).to_rgba8())
}
