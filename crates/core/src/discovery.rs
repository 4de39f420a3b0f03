//! Walks a directory tree and collects the images a tagging session will touch.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recognized image extensions, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("Invalid directory path.")]
    InvalidRoot,
    #[error("No images found in the selected directory.")]
    NoImagesFound,
}

impl DiscoveryError {
    /// `NoImagesFound` is a valid, empty result rather than a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, DiscoveryError::NoImagesFound)
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Recursively collects every supported image under `root`, as absolute paths
/// sorted for stable presentation. Unreadable entries are skipped.
pub fn discover(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, DiscoveryError> {
    let root = root.as_ref();
    if !root.is_dir() || std::fs::read_dir(root).is_err() {
        return Err(DiscoveryError::InvalidRoot);
    }
    let root = std::path::absolute(root).map_err(|_| DiscoveryError::InvalidRoot)?;

    let mut images = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }

    if images.is_empty() {
        return Err(DiscoveryError::NoImagesFound);
    }
    images.sort();
    debug!("discovered {} images under {}", images.len(), root.display());
    Ok(images)
}
