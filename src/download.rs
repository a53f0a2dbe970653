//! Streams remote media into the downloads directory.

use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Bodies without a `Content-Length` are cut off at this multiple of the limit.
const STREAM_CEILING_FACTOR: u64 = 4;

#[derive(Debug)]
pub enum DownloadError {
    Http(String),
    Status(u16),
    Io(std::io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Http(e) => write!(f, "HTTP error: {e}"),
            DownloadError::Status(code) => write!(f, "unexpected status {code}"),
            DownloadError::Io(e) => write!(f, "failed to write download: {e}"),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        DownloadError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downloaded {
    /// The advertised size was above the limit, or the streamed body passed
    /// the hard ceiling. Nothing is left on disk.
    TooLarge { size: u64 },
    File { path: PathBuf, size: u64 },
}

/// Download `url` to `dest`.
///
/// If the response advertises a `Content-Length` above `limit`, the body is
/// not read. Bodies without a length are written up to a hard ceiling of
/// `STREAM_CEILING_FACTOR * limit`; below that the caller checks the final
/// size.
pub async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    limit: u64,
) -> Result<Downloaded, DownloadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::Http(e.to_string()))?;
    if !response.status().is_success() {
        return Err(DownloadError::Status(response.status().as_u16()));
    }

    if let Some(content_length) = response.content_length() {
        if content_length > limit {
            info!("Skipping download of {} bytes (limit {})", content_length, limit);
            return Ok(Downloaded::TooLarge { size: content_length });
        }
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(dest).await?;
    let ceiling = limit.saturating_mul(STREAM_CEILING_FACTOR);
    let size = write_capped(response.bytes_stream(), &mut file, ceiling).await?;
    drop(file);

    if size > ceiling {
        warn!("Aborted download of {} after {} bytes (ceiling {})", url, size, ceiling);
        tokio::fs::remove_file(dest).await?;
        return Ok(Downloaded::TooLarge { size });
    }

    debug!("Downloaded {} bytes to {}", size, dest.display());
    Ok(Downloaded::File { path: dest.to_path_buf(), size })
}

/// Copy `stream` into `out`, stopping at the first chunk that takes the total
/// past `ceiling`. Returns the number of bytes received.
async fn write_capped<S, B, E, W>(mut stream: S, out: &mut W, ceiling: u64) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
    W: AsyncWrite + Unpin,
{
    let mut size = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Http(e.to_string()))?;
        let chunk = chunk.as_ref();
        size += chunk.len() as u64;
        if size > ceiling {
            return Ok(size);
        }
        out.write_all(chunk).await?;
    }
    out.flush().await?;
    Ok(size)
}

/// Reduce an upstream filename to a single safe path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A filename for a picker item's media, taken from its URL when that looks
/// like a file, else random with an extension guessed from the item kind.
pub fn picker_filename(url: &str, kind: Option<&str>) -> String {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let last = path.rsplit('/').next().unwrap_or("");
    if last.contains('.') && !path.ends_with('/') {
        return sanitize_filename(last);
    }
    let ext = match kind {
        Some("photo") => "jpg",
        Some("gif") => "gif",
        _ => "mp4",
    };
    format!("{}.{}", uuid::Uuid::new_v4().simple(), ext)
}
