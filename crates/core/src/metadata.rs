//! Writes a tag string into an image's EXIF block.
//!
//! The primary target is `ImageDescription` in IFD0. When anything in that
//! load, mutate and write cycle fails, the whole cycle is repeated against
//! `UserComment` in the Exif IFD. Each attempt works on a staged sibling copy
//! that only replaces the original once the container was written, so a
//! failed attempt leaves the file untouched. No backup of the original is kept.

use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Character code prefix for a UTF-16 `UserComment`.
const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagField {
    Description,
    UserComment,
}

impl std::fmt::Display for TagField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagField::Description => f.write_str("ImageDescription"),
            TagField::UserComment => f.write_str("UserComment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not load metadata: {0}")]
    Load(String),
    #[error("could not write metadata: {0}")]
    Write(String),
    #[error("metadata library panicked while {0}")]
    Panicked(&'static str),
}

/// Persists one field of an image's metadata container.
pub trait MetadataStore: Send + Sync {
    fn write_field(&self, path: &Path, field: TagField, value: &str) -> Result<(), MetadataError>;
}

/// Writes `tags`, falling back to `UserComment` when the description write fails.
/// Returns the field that ended up holding the tags.
pub fn try_write_tags(
    store: &dyn MetadataStore,
    path: &Path,
    tags: &str,
) -> Result<TagField, MetadataError> {
    match store.write_field(path, TagField::Description, tags) {
        Ok(()) => Ok(TagField::Description),
        Err(e) => {
            warn!("Could not write EXIF data to {}: {}", path.display(), e);
            match store.write_field(path, TagField::UserComment, tags) {
                Ok(()) => Ok(TagField::UserComment),
                Err(e2) => {
                    warn!("Could not write EXIF UserComment to {}: {}", path.display(), e2);
                    Err(e2)
                }
            }
        }
    }
}

/// `true` when either field was written.
pub fn write_tags(store: &dyn MetadataStore, path: &Path, tags: &str) -> bool {
    try_write_tags(store, path, tags).is_ok()
}

/// UserComment payload: 8-byte `UNICODE\0` code followed by UTF-16LE text.
pub fn encode_user_comment(value: &str) -> Vec<u8> {
    let mut bytes = UNICODE_PREFIX.to_vec();
    bytes.extend(value.encode_utf16().flat_map(|c| c.to_le_bytes()));
    bytes
}

/// EXIF container store backed by `little_exif`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifStore;

impl ExifStore {
    fn tag_for(field: TagField, value: &str) -> ExifTag {
        match field {
            TagField::Description => ExifTag::ImageDescription(value.to_string()),
            TagField::UserComment => ExifTag::UserComment(encode_user_comment(value)),
        }
    }
}

impl MetadataStore for ExifStore {
    fn write_field(&self, path: &Path, field: TagField, value: &str) -> Result<(), MetadataError> {
        let staged = stage_copy(path)?;

        let mut metadata = load(staged.path())?;
        metadata.set_tag(Self::tag_for(field, value));

        let written = catch_unwind(AssertUnwindSafe(|| metadata.write_to_file(staged.path())))
            .map_err(|_| MetadataError::Panicked("writing"))?;
        written.map_err(|e| MetadataError::Write(e.to_string()))?;

        staged.persist(path).map_err(|e| MetadataError::Io(e.error))?;
        debug!("wrote {} to {}", field, path.display());
        Ok(())
    }
}

/// Loads the existing container. A supported file without any EXIF block
/// starts from an empty container; every other load error is a failure.
fn load(path: &Path) -> Result<Metadata, MetadataError> {
    match catch_unwind(AssertUnwindSafe(|| Metadata::new_from_path(path)))
        .map_err(|_| MetadataError::Panicked("loading"))?
    {
        Ok(metadata) => Ok(metadata),
        Err(e) if is_missing_metadata(&e) => {
            debug!("no EXIF in {}, starting fresh", path.display());
            Ok(Metadata::new())
        }
        Err(e) => Err(MetadataError::Load(e.to_string())),
    }
}

fn is_missing_metadata(err: &std::io::Error) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("no exif data found") || msg.contains("no metadata found")
}

/// Copies `path` to a hidden sibling with the same extension and permissions.
fn stage_copy(path: &Path) -> Result<NamedTempFile, MetadataError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let staged = tempfile::Builder::new()
        .prefix(".tagging-")
        .suffix(&suffix)
        .tempfile_in(parent)?;
    fs::copy(path, staged.path())?;
    fs::set_permissions(staged.path(), fs::metadata(path)?.permissions())?;
    Ok(staged)
}
