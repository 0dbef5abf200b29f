/// Persisted user settings
///
/// Stored as `settings.json` in the platform config directory. Nothing
/// about the files themselves is kept between runs, only window layout,
/// the last folder and where ExifTool lives.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::media::thumbnail::THUMBNAIL_SIZE;

const APP_DIR: &str = "exif-date-editor";
const FILE_NAME: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no config directory on this platform")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Folder shown when the app was last closed
    pub last_folder: Option<PathBuf>,
    pub window_width: f32,
    pub window_height: f32,
    /// Share of the window taken by the thumbnail grid (0.2 to 0.9)
    pub split_ratio: f32,
    pub thumbnail_size: u32,
    /// Explicit ExifTool location, tried after `EXIFTOOL_PATH`
    pub exiftool_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_folder: None,
            window_width: 1280.0,
            window_height: 800.0,
            split_ratio: 0.68,
            thumbnail_size: THUMBNAIL_SIZE,
            exiftool_path: None,
        }
    }
}

impl Settings {
    /// `<config dir>/exif-date-editor/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from the default location. Never fails: a missing file gives
    /// the defaults, an unreadable one is logged and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("⚠️  No config directory, using default settings");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(SettingsError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("⚠️  Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        Ok(settings.sanitized())
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;

        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Clamp values a hand-edited file could get wrong
    fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        if !self.window_width.is_finite() || self.window_width < 400.0 {
            self.window_width = defaults.window_width;
        }
        if !self.window_height.is_finite() || self.window_height < 300.0 {
            self.window_height = defaults.window_height;
        }
        self.split_ratio = if self.split_ratio.is_finite() {
            self.split_ratio.clamp(0.2, 0.9)
        } else {
            defaults.split_ratio
        };
        self.thumbnail_size = self.thumbnail_size.clamp(64, 512);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);

        let settings = Settings {
            last_folder: Some(PathBuf::from("/photos/2023")),
            window_width: 1600.0,
            exiftool_path: Some(PathBuf::from("/opt/exiftool/exiftool")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, r#"{ "last_folder": "/photos" }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.last_folder, Some(PathBuf::from("/photos")));
        assert_eq!(settings.thumbnail_size, THUMBNAIL_SIZE);
        assert_eq!(settings.split_ratio, Settings::default().split_ratio);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(
            &path,
            r#"{ "window_width": 10, "split_ratio": 3.0, "thumbnail_size": 4096 }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.window_width, 1280.0);
        assert_eq!(settings.split_ratio, 0.9);
        assert_eq!(settings.thumbnail_size, 512);
    }

    #[test]
    fn test_corrupt_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);

        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Io { .. })
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Json(_))
        ));
    }
}
