//! Grid compositor: lays thumbnails out in rows, numbers them, writes a JPEG.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbImage, RgbaImage};
use tracing::{debug, info};

use super::label::LabelRenderer;

const JPEG_QUALITY: u8 = 90;

/// Shape of the preview grid and limits for building it.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub columns: u32,
    /// Thumbnails are resized to `cell_size` x `cell_size`.
    pub cell_size: u32,
    /// Gap between cells, in pixels.
    pub spacing: u32,
    /// Height of the band the index label is drawn into.
    pub label_height: u32,
    pub background: [u8; 3],
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            cell_size: 100,
            spacing: 10,
            label_height: 25,
            background: [69, 69, 69],
            fetch_timeout: Duration::from_secs(10),
            max_concurrent_fetches: 4,
        }
    }
}

/// Row-major placement of `count` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
    pub cell_size: u32,
    pub spacing: u32,
}

impl GridLayout {
    /// Returns `None` for zero cells (or zero columns); there is no
    /// meaningful canvas for those.
    pub fn new(count: usize, config: &GridConfig) -> Option<Self> {
        if count == 0 || config.columns == 0 {
            return None;
        }
        let rows = (count as u32).div_ceil(config.columns);
        Some(Self {
            columns: config.columns,
            rows,
            cell_size: config.cell_size,
            spacing: config.spacing,
        })
    }

    pub fn width(&self) -> u32 {
        self.columns * self.cell_size + (self.columns - 1) * self.spacing
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_size + (self.rows - 1) * self.spacing
    }

    /// Top-left pixel of the cell holding the `index`-th thumbnail.
    pub fn origin(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        let stride = self.cell_size + self.spacing;
        ((index % self.columns) * stride, (index / self.columns) * stride)
    }
}

#[derive(Debug)]
pub enum GridError {
    /// Every thumbnail failed, nothing to lay out.
    Empty,
    Io(std::io::Error),
    Encode(image::ImageError),
    /// The blocking encode task panicked or was cancelled.
    Join(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Empty => write!(f, "no thumbnails to compose"),
            GridError::Io(e) => write!(f, "failed to write grid: {e}"),
            GridError::Encode(e) => write!(f, "failed to encode grid: {e}"),
            GridError::Join(e) => write!(f, "grid encoder task failed: {e}"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Io(e) => Some(e),
            GridError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        GridError::Io(e)
    }
}

impl From<image::ImageError> for GridError {
    fn from(e: image::ImageError) -> Self {
        GridError::Encode(e)
    }
}

/// Compose the compacted thumbnails onto one canvas.
///
/// Thumbnails go down first and labels second, so a label is never covered
/// by a neighbouring layer. Cells are disjoint, so order within each pass
/// does not matter.
pub fn compose(
    thumbnails: &[RgbaImage],
    config: &GridConfig,
    labels: &LabelRenderer,
) -> Result<RgbImage, GridError> {
    let layout = GridLayout::new(thumbnails.len(), config).ok_or(GridError::Empty)?;
    let [r, g, b] = config.background;
    let mut canvas = RgbaImage::from_pixel(layout.width(), layout.height(), Rgba([r, g, b, 255]));

    for (i, thumb) in thumbnails.iter().enumerate() {
        let (x, y) = layout.origin(i);
        imageops::overlay(&mut canvas, thumb, x as i64, y as i64);
    }

    for i in 0..thumbnails.len() {
        let (x, y) = layout.origin(i);
        let band = labels.render(&(i + 1).to_string(), config.cell_size, config.label_height);
        imageops::overlay(&mut canvas, &band, x as i64, y as i64);
    }

    debug!(
        "Composed {} thumbnails into {}x{} grid ({} rows)",
        thumbnails.len(),
        layout.width(),
        layout.height(),
        layout.rows
    );
    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Compose the grid and write it as a JPEG into `dir`.
///
/// Returns the absolute path only after the file is fully written and
/// synced. The caller owns the file and must delete it.
pub async fn build_grid(
    thumbnails: &[RgbaImage],
    config: &GridConfig,
    labels: &LabelRenderer,
    dir: &Path,
) -> Result<PathBuf, GridError> {
    let canvas = compose(thumbnails, config, labels)?;

    tokio::fs::create_dir_all(dir).await?;
    let dir = tokio::fs::canonicalize(dir).await?;
    let path = dir.join(unique_filename());

    let written = tokio::task::spawn_blocking(move || write_jpeg(&canvas, path))
        .await
        .map_err(|e| GridError::Join(e.to_string()))??;

    info!("Thumbnail grid written to {}", written.display());
    Ok(written)
}

fn write_jpeg(canvas: &RgbImage, path: PathBuf) -> Result<PathBuf, GridError> {
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    let encoded = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(canvas);
    if let Err(e) = encoded {
        drop(writer);
        let _ = std::fs::remove_file(&path);
        return Err(e.into());
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(path)
}

/// Millisecond timestamp plus a random suffix, so two builds in the same
/// millisecond never share a file.
fn unique_filename() -> String {
    format!(
        "{}-{}.jpg",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: [u8; 3], size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([color[0], color[1], color[2], 255]))
    }

    fn palette(n: usize) -> Vec<[u8; 3]> {
        (0..n).map(|i| [(i as u8 + 1) * 20, 200 - i as u8 * 15, 40]).collect()
    }

    /// Sample well below the label band.
    fn cell_sample(layout: &GridLayout, i: usize) -> (u32, u32) {
        let (x, y) = layout.origin(i);
        (x + 80, y + 80)
    }

    #[test]
    fn test_width_is_fixed_for_any_count() {
        let config = GridConfig::default();
        for n in 1..=12 {
            let layout = GridLayout::new(n, &config).unwrap();
            assert_eq!(layout.width(), 320, "n={n}");
        }
    }

    #[test]
    fn test_height_follows_row_count() {
        let config = GridConfig::default();
        for n in 1..=12usize {
            let rows = n.div_ceil(3) as u32;
            let layout = GridLayout::new(n, &config).unwrap();
            assert_eq!(layout.rows, rows);
            assert_eq!(layout.height(), rows * 100 + (rows - 1) * 10, "n={n}");
        }
    }

    #[test]
    fn test_single_item_layout() {
        let layout = GridLayout::new(1, &GridConfig::default()).unwrap();
        assert_eq!(layout.rows, 1);
        assert_eq!(layout.height(), 100);
        assert_eq!(layout.origin(0), (0, 0));
    }

    #[test]
    fn test_four_items_wrap_to_second_row() {
        let layout = GridLayout::new(4, &GridConfig::default()).unwrap();
        assert_eq!(layout.rows, 2);
        assert_eq!(layout.origin(0), (0, 0));
        assert_eq!(layout.origin(1), (110, 0));
        assert_eq!(layout.origin(2), (220, 0));
        assert_eq!(layout.origin(3), (0, 110));
    }

    #[test]
    fn test_empty_layout() {
        assert!(GridLayout::new(0, &GridConfig::default()).is_none());
    }

    #[test]
    fn test_custom_shape() {
        let config = GridConfig { columns: 2, cell_size: 8, spacing: 2, label_height: 4, ..GridConfig::default() };
        let layout = GridLayout::new(5, &config).unwrap();
        assert_eq!((layout.width(), layout.height()), (18, 28));
        assert_eq!(layout.origin(3), (10, 10));
        assert_eq!(layout.origin(4), (0, 20));
    }

    #[test]
    fn test_compose_rejects_empty() {
        let result = compose(&[], &GridConfig::default(), &LabelRenderer::Builtin);
        assert!(matches!(result, Err(GridError::Empty)));
    }

    #[test]
    fn test_compose_places_thumbnails() {
        let config = GridConfig::default();
        let colors = palette(4);
        let thumbs: Vec<RgbaImage> = colors.iter().map(|c| solid(*c, 100)).collect();
        let canvas = compose(&thumbs, &config, &LabelRenderer::Builtin).unwrap();
        assert_eq!(canvas.dimensions(), (320, 210));

        let layout = GridLayout::new(4, &config).unwrap();
        for (i, color) in colors.iter().enumerate() {
            let (x, y) = cell_sample(&layout, i);
            assert_eq!(canvas.get_pixel(x, y).0, *color, "cell {i}");
        }
    }

    #[test]
    fn test_unused_cells_and_gaps_show_background() {
        let config = GridConfig::default();
        let thumbs: Vec<RgbaImage> = palette(4).iter().map(|c| solid(*c, 100)).collect();
        let canvas = compose(&thumbs, &config, &LabelRenderer::Builtin).unwrap();
        // gap between first and second column
        assert_eq!(canvas.get_pixel(105, 50).0, [69, 69, 69]);
        // empty cells on the second row
        assert_eq!(canvas.get_pixel(160, 160).0, [69, 69, 69]);
        assert_eq!(canvas.get_pixel(300, 200).0, [69, 69, 69]);
    }

    #[test]
    fn test_labels_drawn_over_thumbnails() {
        let config = GridConfig::default();
        let thumbs = vec![solid([0, 0, 0], 100), solid([0, 0, 0], 100)];
        let canvas = compose(&thumbs, &config, &LabelRenderer::Builtin).unwrap();
        let layout = GridLayout::new(2, &config).unwrap();

        for i in 0..2 {
            let (ox, oy) = layout.origin(i);
            let band = LabelRenderer::Builtin.render(&(i + 1).to_string(), 100, 25);
            for (x, y, p) in band.enumerate_pixels() {
                if p[3] == 255 {
                    assert_eq!(canvas.get_pixel(ox + x, oy + y).0, [255, 255, 255]);
                }
            }
        }
    }

    #[test]
    fn test_label_matches_compacted_position() {
        let config = GridConfig::default();
        let thumbs: Vec<RgbaImage> = (0..9).map(|_| solid([0, 0, 0], 100)).collect();
        let canvas = compose(&thumbs, &config, &LabelRenderer::Builtin).unwrap();
        let layout = GridLayout::new(9, &config).unwrap();

        for k in 0..9 {
            let (ox, oy) = layout.origin(k);
            let cell = imageops::crop_imm(&canvas, ox, oy, 100, 25).to_image();
            let expected = LabelRenderer::Builtin.render(&(k + 1).to_string(), 100, 25);
            for (x, y, p) in expected.enumerate_pixels() {
                let white = cell.get_pixel(x, y).0 == [255, 255, 255];
                assert_eq!(white, p[3] == 255, "label {} at ({x},{y})", k + 1);
            }
        }
    }

    #[tokio::test]
    async fn test_build_grid_writes_readable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloads");
        let thumbs: Vec<RgbaImage> = palette(5).iter().map(|c| solid(*c, 100)).collect();

        let path = build_grid(&thumbs, &GridConfig::default(), &LabelRenderer::Builtin, &target)
            .await
            .unwrap();

        assert!(path.is_absolute());
        assert!(path.starts_with(target.canonicalize().unwrap()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 210));
    }

    #[tokio::test]
    async fn test_build_grid_rejects_empty_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloads");
        let result = build_grid(&[], &GridConfig::default(), &LabelRenderer::Builtin, &target).await;
        assert!(matches!(result, Err(GridError::Empty)));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_build_grid_unique_paths() {
        let dir = tempfile::tempdir().unwrap();
        let thumbs = vec![solid([10, 20, 30], 100)];
        let config = GridConfig::default();
        let (a, b) = tokio::join!(
            build_grid(&thumbs, &config, &LabelRenderer::Builtin, dir.path()),
            build_grid(&thumbs, &config, &LabelRenderer::Builtin, dir.path()),
        );
        assert_ne!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn test_build_grid_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let thumbs = vec![solid([10, 20, 30], 100)];
        let result =
            build_grid(&thumbs, &GridConfig::default(), &LabelRenderer::Builtin, &blocker.join("sub")).await;
        assert!(matches!(result, Err(GridError::Io(_))));
    }
}
