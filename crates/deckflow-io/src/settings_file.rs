//! On-disk settings file format.
//!
//! Settings are wrapped in a [`SettingsFile`] carrying a format version and
//! timestamps, and stored as RON, JSON or TOML depending on the extension.

use crate::error::{IoError, Result};
use chrono::{DateTime, Utc};
use deckflow_core::AppSettings;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// The current version of the settings file format.
///
/// Stamped into every saved file. Incremented when a change to
/// [`AppSettings`] can no longer be read by `#[serde(default)]` alone.
pub const SETTINGS_FILE_VERSION: &str = "1.0.0";

/// Maximum allowed settings file size (1 MB).
pub const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

/// Serialization chosen from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    /// `.ron`
    Ron,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl SettingsFormat {
    /// Picks the format for a path. Paths without an extension are RON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("ron");

        match extension {
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Top-level structure of a saved settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsFile {
    /// The version of the settings file format.
    pub version: String,
    /// Creation and modification times.
    pub metadata: SettingsMetadata,
    /// The stored settings.
    pub app_settings: AppSettings,
}

impl SettingsFile {
    /// Wraps settings, stamping creation and modification times with now.
    pub fn new(app_settings: AppSettings) -> Self {
        let now = Utc::now();
        Self {
            version: SETTINGS_FILE_VERSION.to_string(),
            metadata: SettingsMetadata {
                created_at: now,
                modified_at: now,
            },
            app_settings,
        }
    }

    /// Loads a settings file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_limit(path, MAX_SETTINGS_FILE_SIZE)
    }

    fn load_with_limit(path: &Path, limit: u64) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > limit {
            return Err(IoError::FileTooLarge { size, limit });
        }

        let format = SettingsFormat::from_path(path)?;
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;

        let file = match format {
            SettingsFormat::Json => serde_json::from_str(&content)?,
            SettingsFormat::Ron => ron::from_str(&content)?,
            SettingsFormat::Toml => toml::from_str(&content)?,
        };
        Ok(file)
    }

    /// Saves to the given path, updating `modified_at`.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let format = SettingsFormat::from_path(path)?;

        self.metadata.modified_at = Utc::now();

        match format {
            SettingsFormat::Json => {
                let file = File::create(path)?;
                serde_json::to_writer_pretty(file, self)?;
            }
            SettingsFormat::Ron => {
                let config = ron::ser::PrettyConfig::default();
                let s = ron::ser::to_string_pretty(self, config)?;
                File::create(path)?.write_all(s.as_bytes())?;
            }
            SettingsFormat::Toml => {
                let s = toml::to_string_pretty(self)?;
                File::create(path)?.write_all(s.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Metadata associated with a settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsMetadata {
    /// When the file was first written.
    pub created_at: DateTime<Utc>,
    /// When the file was last written.
    pub modified_at: DateTime<Utc>,
}
