//! Media file handling
//!
//! This module handles:
//! - Deciding which files belong in a catalog (by extension)
//! - Telling videos apart from still images
//! - Building the path identity used to match background results
//! - Producing thumbnails for stills (thumbnail.rs) and videos (video.rs)

pub mod thumbnail;
pub mod video;

use std::env;
use std::path::{Component, Path, PathBuf};

pub use thumbnail::{produce, Thumbnail, ThumbnailError};

/// Extensions that are listed in a catalog
pub const CATALOG_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "mp4", "mov"];

/// Extensions that get video-specific thumbnail and date handling
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Check whether the path's extension (case-insensitive) is one of `exts`
pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            exts.iter().any(|&x| x == e)
        })
        .unwrap_or(false)
}

/// Should this file appear in the catalog?
pub fn is_supported(path: &Path) -> bool {
    has_extension(path, &CATALOG_EXTENSIONS)
}

/// Is this file handled as a video?
pub fn is_video(path: &Path) -> bool {
    has_extension(path, &VIDEO_EXTENSIONS)
}

/// Identity key of a path: absolute, lexically normalized, lower-cased.
///
/// ExifTool may report a file under a different casing, with forward
/// slashes on Windows, or relative to the working directory. All of those
/// collapse to the same key.
pub fn identity_key(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized.to_string_lossy().to_lowercase()
}

/// Lower-cased file name, the secondary key used when full paths disagree
pub fn basename_key(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}
