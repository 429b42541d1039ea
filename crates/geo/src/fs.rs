//! Small filesystem helpers shared by the cache tiers.

use std::path::Path;

use crate::{Error, Result};

pub fn create_directory_for_file(p: &Path) -> Result {
    if let Some(parent_dir) = p.parent() {
        std::fs::create_dir_all(parent_dir).map_err(|e| {
            Error::Runtime(format!(
                "Failed to create output directory for file '{}' ({e})",
                p.to_string_lossy()
            ))
        })?;
    }

    Ok(())
}

/// Base name of a file with the extension stripped, used as the identity of
/// rasters and shapefiles in cache keys.
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))
}

pub fn sanitize_filename(name: &str, replacement_char: char) -> String {
    let forbidden = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    name.chars()
        .map(|c| if forbidden.contains(&c) { replacement_char } else { c })
        .collect()
}
