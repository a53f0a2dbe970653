//! Index labels drawn over grid cells.

use std::path::Path;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use tracing::info;

const LABEL_COLOR: [u8; 3] = [255, 255, 255];

/// 5x7 bitmaps for '0'..='9', one byte per row, bit 4 is the leftmost column.
const DIGITS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Renders label text into a transparent band.
///
/// `Builtin` only knows digits, which is all grid labels ever contain.
/// `Font` uses an outline font loaded from disk.
pub enum LabelRenderer {
    Builtin,
    Font(FontVec),
}

impl std::fmt::Debug for LabelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "LabelRenderer::Builtin"),
            Self::Font(_) => write!(f, "LabelRenderer::Font"),
        }
    }
}

impl LabelRenderer {
    /// Load the configured font, or fall back to the built-in digits.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let Some(path) = path else {
            return Ok(Self::Builtin);
        };
        let data = std::fs::read(path)
            .map_err(|e| format!("Failed to read label font {}: {e}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| format!("Invalid font data in {}", path.display()))?;
        info!("Loaded label font from {}", path.display());
        Ok(Self::Font(font))
    }

    /// Render `text` into a `width`x`height` band, white on transparent.
    pub fn render(&self, text: &str, width: u32, height: u32) -> RgbaImage {
        let mut band = RgbaImage::new(width, height);
        match self {
            Self::Builtin => draw_builtin(&mut band, text),
            Self::Font(font) => draw_font(&mut band, font, text),
        }
        band
    }
}

fn draw_builtin(band: &mut RgbaImage, text: &str) {
    let (width, height) = band.dimensions();
    let scale = (height.saturating_sub(4) / GLYPH_H).max(1);
    let advance = (GLYPH_W + 1) * scale;
    let top = height.saturating_sub(GLYPH_H * scale) / 2;
    let mut left = width / 50;

    for c in text.chars() {
        let Some(digit) = c.to_digit(10) else {
            left += advance;
            continue;
        };
        for (row, bits) in DIGITS[digit as usize].iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                fill_block(band, left + col * scale, top + row as u32 * scale, scale);
            }
        }
        left += advance;
    }
}

fn fill_block(band: &mut RgbaImage, x: u32, y: u32, size: u32) {
    let [r, g, b] = LABEL_COLOR;
    for py in y..(y + size).min(band.height()) {
        for px in x..(x + size).min(band.width()) {
            band.put_pixel(px, py, Rgba([r, g, b, 255]));
        }
    }
}

fn draw_font(band: &mut RgbaImage, font: &FontVec, text: &str) {
    let (width, height) = band.dimensions();
    // 24px text in a 25px band, baseline a bit below the vertical middle
    let px = height as f32 * 0.96;
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let baseline = height as f32 / 2.0 + px * 0.3;
    let mut caret = width as f32 * 0.02;
    let [r, g, b] = LABEL_COLOR;

    for c in text.chars() {
        let id = font.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                return;
            }
            let alpha = (coverage.clamp(0.0, 1.0) * 255.0) as u8;
            let pixel = band.get_pixel_mut(x as u32, y as u32);
            if alpha > pixel[3] {
                *pixel = Rgba([r, g, b, alpha]);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(band: &RgbaImage) -> Vec<(u32, u32)> {
        band.enumerate_pixels()
            .filter(|(_, _, p)| p[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_band_has_requested_size() {
        let band = LabelRenderer::Builtin.render("7", 100, 25);
        assert_eq!(band.dimensions(), (100, 25));
    }

    #[test]
    fn test_builtin_draws_white_opaque_pixels() {
        let band = LabelRenderer::Builtin.render("1", 100, 25);
        let pixels = lit(&band);
        assert!(!pixels.is_empty());
        for (x, y) in pixels {
            assert_eq!(*band.get_pixel(x, y), Rgba([255, 255, 255, 255]));
        }
    }

    #[test]
    fn test_builtin_stays_near_left_edge() {
        let band = LabelRenderer::Builtin.render("1", 100, 25);
        let max_x = lit(&band).iter().map(|(x, _)| *x).max().unwrap();
        assert!(max_x < 25, "single digit should hug the left edge, got x={max_x}");
    }

    #[test]
    fn test_two_digits_extend_further_right() {
        let one = LabelRenderer::Builtin.render("1", 100, 25);
        let ten = LabelRenderer::Builtin.render("10", 100, 25);
        let right = |band: &RgbaImage| lit(band).iter().map(|(x, _)| *x).max().unwrap();
        assert!(right(&ten) > right(&one));
    }

    #[test]
    fn test_digits_render_differently() {
        let bands: Vec<RgbaImage> = (1..=9)
            .map(|n| LabelRenderer::Builtin.render(&n.to_string(), 100, 25))
            .collect();
        for i in 0..bands.len() {
            for j in (i + 1)..bands.len() {
                assert_ne!(bands[i], bands[j], "labels {} and {} look the same", i + 1, j + 1);
            }
        }
    }

    #[test]
    fn test_tiny_band_does_not_panic() {
        let band = LabelRenderer::Builtin.render("123", 4, 3);
        assert_eq!(band.dimensions(), (4, 3));
    }

    #[test]
    fn test_missing_font_file() {
        let result = LabelRenderer::load(Some(Path::new("/nonexistent/font.ttf")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_font_data() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not a font").unwrap();
        let result = LabelRenderer::load(Some(file.path()));
        assert!(result.unwrap_err().contains("Invalid font"));
    }

    #[test]
    fn test_no_font_means_builtin() {
        assert!(matches!(LabelRenderer::load(None), Ok(LabelRenderer::Builtin)));
    }
}
