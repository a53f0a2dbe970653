//! Sticker conversion: static stickers (WebP) become PNG documents.

use std::io::Cursor;

use image::ImageFormat;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerKind {
    /// TGS (Lottie) - not supported.
    Animated,
    /// WebM, forwarded unchanged.
    Video,
    /// WebP, converted to PNG.
    Static,
}

impl StickerKind {
    pub fn classify(is_animated: bool, is_video: bool) -> Self {
        if is_animated {
            StickerKind::Animated
        } else if is_video {
            StickerKind::Video
        } else {
            StickerKind::Static
        }
    }
}

#[derive(Debug)]
pub struct StickerError(image::ImageError);

impl std::fmt::Display for StickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sticker conversion failed: {}", self.0)
    }
}

impl std::error::Error for StickerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Decode a sticker image and re-encode it as PNG.
pub fn convert_to_png(data: &[u8]) -> Result<Vec<u8>, StickerError> {
    let img = image::load_from_memory(data).map_err(StickerError)?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).map_err(StickerError)?;
    debug!("Converted sticker {}x{} ({} -> {} bytes)", img.width(), img.height(), data.len(), out.get_ref().len());
    Ok(out.into_inner())
}

/// Local filename for a sticker, derived from its file id.
pub fn sticker_filename(file_id: &str, ext: &str) -> String {
    let stem: String = file_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.{ext}")
}
