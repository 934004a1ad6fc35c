//! Project providers and their registry.
//!
//! A provider knows how to enumerate and load the projects of one source.
//! The set of providers is closed ([`Provider`]); a source names its provider
//! by string id, resolved through a [`ProviderRegistry`].

use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::types::{Project, ProjectFile, ProjectSummary};

/// Indicator shown for providers without one, or not registered at all.
pub const UNKNOWN_INDICATOR: char = '?';

/// Name of the directory holding a source's projects.
pub const PROJECTS_DIR: &str = "projects";

// ============================================================================
// CAPABILITY
// ============================================================================

/// What every provider can do.
pub trait SourceProvider {
    /// Projects in display order.
    fn list_projects(&self) -> Result<Vec<ProjectSummary>, SourceError>;

    /// The project with `id`, or `None` if the source has no such project.
    fn get_project(&self, id: &str) -> Result<Option<Project>, SourceError>;
}

/// The closed set of provider implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Local(LocalProvider),
}

impl SourceProvider for Provider {
    fn list_projects(&self) -> Result<Vec<ProjectSummary>, SourceError> {
        match self {
            Provider::Local(local) => local.list_projects(),
        }
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, SourceError> {
        match self {
            Provider::Local(local) => local.get_project(id),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Builds a provider for the source stored in `source_dir`.
pub type ProviderConstructor = fn(source_dir: &Path, data: Option<&Value>) -> Provider;

/// One registered provider id.
#[derive(Clone)]
pub struct ProviderEntry {
    pub id: &'static str,
    pub indicator: Option<char>,
    pub construct: ProviderConstructor,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("id", &self.id)
            .field("indicator", &self.indicator)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    /// Registry without any provider.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in provider.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("local", Some('L'), LocalProvider::construct);
        registry
    }

    /// Register `id`, replacing any previous entry with the same id.
    pub fn register(
        &mut self,
        id: &'static str,
        indicator: Option<char>,
        construct: ProviderConstructor,
    ) {
        self.entries.retain(|entry| entry.id != id);
        self.entries.push(ProviderEntry {
            id,
            indicator,
            construct,
        });
    }

    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Display indicator for `id`; `?` when unknown or unset.
    pub fn indicator(&self, id: &str) -> char {
        self.get(id)
            .and_then(|entry| entry.indicator)
            .unwrap_or(UNKNOWN_INDICATOR)
    }

    /// Construct the provider registered as `id`.
    pub fn construct(&self, id: &str, source_dir: &Path, data: Option<&Value>) -> Option<Provider> {
        self.get(id).map(|entry| (entry.construct)(source_dir, data))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter()
    }
}

// ============================================================================
// LOCAL PROVIDER
// ============================================================================

/// Projects are the directories under `<source>/projects/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProvider {
    projects_dir: PathBuf,
}

impl LocalProvider {
    pub fn new(source_dir: &Path) -> Self {
        LocalProvider {
            projects_dir: source_dir.join(PROJECTS_DIR),
        }
    }

    fn construct(source_dir: &Path, _data: Option<&Value>) -> Provider {
        Provider::Local(LocalProvider::new(source_dir))
    }
}

impl SourceProvider for LocalProvider {
    fn list_projects(&self) -> Result<Vec<ProjectSummary>, SourceError> {
        if !self.projects_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in WalkDir::new(&self.projects_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(io::Error::from)
                .map_err(SourceError::io(&self.projects_dir))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            projects.push(ProjectSummary {
                id: name.clone(),
                name,
            });
        }
        Ok(projects)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, SourceError> {
        if !is_single_component(id) {
            return Ok(None);
        }
        let root = self.projects_dir.join(id);
        if !root.is_dir() {
            return Ok(None);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = entry
                .map_err(io::Error::from)
                .map_err(SourceError::io(&root))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&root) {
                files.push(ProjectFile {
                    name: relative_name(relative),
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Some(Project {
            id: id.to_string(),
            name: id.to_string(),
            files,
        }))
    }
}

/// True if `id` names one entry directly inside a directory.
pub(crate) fn is_single_component(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `/`-joined relative path, whatever the platform separator.
fn relative_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// TESTS
// ============================================================================
