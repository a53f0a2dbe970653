//! Picker previews - a numbered thumbnail grid for multi-choice results.
//!
//! A grid build fetches every candidate's thumbnail, drops the ones that
//! failed, and composes the survivors into one JPEG. Labels are assigned to
//! survivors in order, so `PickerPreview::entries` is the only reliable way
//! back from a label to the item it shows.

pub mod fetch;
pub mod grid;
pub mod label;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cobalt::PickerItem;

pub use fetch::{fetch_thumbnails, normalize_thumbnail, FetchError};
pub use grid::{build_grid, compose, GridConfig, GridError, GridLayout};
pub use label::LabelRenderer;

/// A rendered preview and its label-to-item mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerPreview {
    pub path: PathBuf,
    /// `entries[k]` is the index into the original items of the cell
    /// labelled `k + 1`.
    pub entries: Vec<usize>,
}

impl PickerPreview {
    /// Original item index for a 1-based label.
    pub fn item_index(&self, label: usize) -> Option<usize> {
        label.checked_sub(1).and_then(|k| self.entries.get(k).copied())
    }

    /// The items shown in the grid, in label order (label 1 first).
    pub fn labelled_items(&self, items: &[PickerItem]) -> Vec<PickerItem> {
        (1..=self.entries.len())
            .filter_map(|label| self.item_index(label))
            .filter_map(|i| items.get(i).cloned())
            .collect()
    }
}

/// Fetch thumbnails for `items` and write the numbered grid into `dir`.
pub async fn build_preview(
    client: &reqwest::Client,
    items: &[PickerItem],
    config: &GridConfig,
    labels: &LabelRenderer,
    dir: &Path,
) -> Result<PickerPreview, GridError> {
    let fetched = fetch_thumbnails(client, items, config).await;

    let (entries, thumbnails): (Vec<usize>, Vec<_>) = fetched
        .into_iter()
        .enumerate()
        .filter_map(|(i, thumb)| thumb.map(|t| (i, t)))
        .unzip();

    if thumbnails.len() < items.len() {
        info!(
            "{} of {} thumbnails unavailable, grid shows {}",
            items.len() - thumbnails.len(),
            items.len(),
            thumbnails.len()
        );
    }

    let path = build_grid(&thumbnails, config, labels, dir).await?;
    Ok(PickerPreview { path, entries })
}
