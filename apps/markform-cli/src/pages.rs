//! Locating and decoding page renders.

use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Trailing decimal number in a file stem, e.g. `form_12` -> 12.
fn page_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

/// PNG files in `dir`, ordered by the trailing page number in their names.
///
/// Files without a number sort after numbered ones, by name.
pub fn collect_page_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read page directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_png(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        bail!("No PNG pages found in {}", dir.display());
    }

    paths.sort_by_key(|p| (page_number(p).is_none(), page_number(p), p.file_name().map(|n| n.to_owned())));
    Ok(paths)
}

/// Decode a page render into 8-bit RGB, dropping any alpha channel.
pub fn load_raster(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(img.to_rgb8())
}
