//! Settings I/O
//!
//! High-level save/load of [`AppSettings`]. Version validation lives here,
//! serialization in [`crate::settings_file`].

use crate::error::{IoError, Result};
use crate::settings_file::{SettingsFile, SETTINGS_FILE_VERSION};
use deckflow_core::AppSettings;
use std::path::Path;
use tracing::info;

/// Saves settings to a file, clearing their dirty flag.
pub fn save_settings(settings: &mut AppSettings, path: &Path) -> Result<()> {
    let mut file = SettingsFile::new(settings.clone());
    file.save(path)?;
    settings.dirty = false;
    info!("Settings saved to {}", path.display());
    Ok(())
}

/// Loads settings from a file.
///
/// Fails on a format version other than [`SETTINGS_FILE_VERSION`]. Loaded
/// device settings are normalized before they are returned.
pub fn load_settings(path: &Path) -> Result<AppSettings> {
    let file = SettingsFile::load(path)?;

    if file.version != SETTINGS_FILE_VERSION {
        return Err(IoError::VersionMismatch {
            expected: SETTINGS_FILE_VERSION.to_string(),
            found: file.version,
        });
    }

    let mut settings = file.app_settings;
    for input in &mut settings.manager.inputs {
        input.normalize();
    }
    for output in &mut settings.manager.outputs {
        output.normalize();
    }

    info!("Settings loaded from {}", path.display());
    Ok(settings)
}
