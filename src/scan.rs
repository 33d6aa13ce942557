//! Input discovery.
//!
//! Recursively walks the input directory and collects every file with a
//! processable image extension. The result is sorted by path so grouping is
//! deterministic across runs and platforms.

use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("input directory does not exist: {0}")]
    MissingInputDir(PathBuf),
    #[error("failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Recursively collect image files under `root`.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingInputDir(root.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            found.push(entry.path().to_path_buf());
        }
    }
    found.sort();
    debug!("discovered {} image(s) under {}", found.len(), root.display());
    Ok(found)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
