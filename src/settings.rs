//! Persisted settings: load-or-create at startup, rewrite on change.
//!
//! Failures here never stop the application. A missing document is
//! created, an unreadable one is replaced in memory by the default, and a
//! failed save is logged and forgotten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::Settings;

/// Returns the default settings document path.
///
/// On Linux: ~/.config/prm/settings.json
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prm")
        .join("settings.json")
}

/// The settings document and where it lives.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load the document at `path`, writing a default one if it is missing.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let settings = if path.exists() {
            match load_settings(&path) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "unreadable settings, using defaults"
                    );
                    Settings::default()
                }
            }
        } else {
            let settings = Settings::default();
            if let Err(e) = save_settings(&settings, &path) {
                warn!(path = %path.display(), error = %e, "could not create settings");
            }
            settings
        };

        SettingsStore { path, settings }
    }

    /// In-memory store that is never written, for callers without a path.
    pub fn in_memory(settings: Settings) -> Self {
        SettingsStore {
            path: PathBuf::new(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_source_id(&self) -> Option<&str> {
        self.settings.last_source_id.as_deref()
    }

    /// Record `id` as the last used source. Writes only when it changes.
    pub fn remember_source(&mut self, id: &str) {
        if self.last_source_id() == Some(id) {
            return;
        }
        self.settings.last_source_id = Some(id.to_string());
        self.persist();
    }

    /// Clear the last used source. Writes only when one was set.
    pub fn forget_source(&mut self) {
        if self.settings.last_source_id.take().is_some() {
            self.persist();
        }
    }

    fn persist(&self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match save_settings(&self.settings, &self.path) {
            Ok(()) => debug!(path = %self.path.display(), "settings saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not save settings"),
        }
    }
}

/// Read and parse a settings document.
pub fn load_settings(path: &Path) -> io::Result<Settings> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("Invalid settings: {}", e))
    })
}

/// Write the whole document, creating its directory if needed.
pub fn save_settings(settings: &Settings, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(settings).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("Failed to serialize settings: {}", e))
    })?;
    fs::write(path, contents)
}

// ============================================================================
// TESTS
// ============================================================================
