//! Domain types for prm.
//!
//! Plain data shared between the catalog, the providers and the UI states.
//! On-disk documents use camelCase keys.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// PERSISTED DOCUMENTS
// ============================================================================

/// The settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Source reopened at startup, if any.
    #[serde(default)]
    pub last_source_id: Option<String>,
}

/// Contents of a source's `source.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    /// Display name.
    pub name: String,
    /// Registered provider id.
    pub provider: String,
    /// Opaque provider options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_data: Option<serde_json::Value>,
}

impl SourceMeta {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        SourceMeta {
            name: name.into(),
            provider: provider.into(),
            provider_data: None,
        }
    }
}

/// A source as listed by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub id: String,
    pub meta: SourceMeta,
}

// ============================================================================
// PROJECTS
// ============================================================================

/// A project as listed by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
}

/// A file inside a project, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub name: String,
}

/// A fully loaded project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub files: Vec<ProjectFile>,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Runtime configuration, resolved from the command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of the source catalog.
    pub data_dir: PathBuf,
    /// Settings document.
    pub settings_path: PathBuf,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Redraw period when no input arrives.
    pub tick_interval: Duration,
}

/// Redraw period driving marquees and toast progress.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::source::default_sources_dir(),
            settings_path: crate::settings::default_settings_path(),
            log_dir: crate::logging::default_log_dir(),
            tick_interval: TICK_INTERVAL,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
