//! The on-disk source catalog.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/<source_id>/source.json
//! <data_dir>/<source_id>/projects/<project>/...
//! ```
//!
//! Structure:
//! - Pure functions: id generation, paths
//! - Effect functions: listing, loading, creating sources

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::provider::{
    PROJECTS_DIR, Provider, ProviderRegistry, SourceProvider, is_single_component,
};
use crate::types::{Project, ProjectSummary, SourceInfo, SourceMeta};

/// Metadata filename within a source directory.
pub const META_FILENAME: &str = "source.json";

/// Number of base-36 characters appended to the timestamp of an id.
const ID_SUFFIX_LEN: usize = 3;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

// ============================================================================
// OPEN SOURCE
// ============================================================================

/// A source with its provider resolved, ready to list projects.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub id: String,
    pub meta: SourceMeta,
    provider: Provider,
}

impl Source {
    pub fn new(id: impl Into<String>, meta: SourceMeta, provider: Provider) -> Self {
        Source {
            id: id.into(),
            meta,
            provider,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>, SourceError> {
        self.provider.list_projects()
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, SourceError> {
        self.provider.get_project(id)
    }
}

// ============================================================================
// PURE FUNCTIONS
// ============================================================================

/// Returns the default catalog directory.
///
/// On Linux: ~/.local/share/prm/sources/
pub fn default_sources_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prm")
        .join("sources")
}

/// Generate a source id candidate.
///
/// Format: base-36 millisecond timestamp followed by a 3-character base-36
/// suffix, so ids sort by creation time.
pub fn generate_source_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed =
        now.subsec_nanos() ^ std::process::id().rotate_left(16) ^ counter.wrapping_mul(7919);
    let suffix = to_base36(u128::from(mixed % 36u32.pow(ID_SUFFIX_LEN as u32)));

    format!("{}{:0>width$}", to_base36(now.as_millis()), suffix, width = ID_SUFFIX_LEN)
}

/// Lowercase base-36 rendering of `n`.
pub fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// CATALOG
// ============================================================================

/// All sources stored under one data directory.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    root: PathBuf,
    registry: ProviderRegistry,
}

impl SourceCatalog {
    pub fn new(root: impl Into<PathBuf>, registry: ProviderRegistry) -> Self {
        SourceCatalog {
            root: root.into(),
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn source_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.source_dir(id).join(META_FILENAME)
    }

    /// Whether a source directory named `id` exists.
    pub fn exists(&self, id: &str) -> bool {
        is_single_component(id) && self.source_dir(id).is_dir()
    }

    /// Every source with valid metadata, sorted by name then id.
    ///
    /// Directories without `source.json`, or with an invalid one, are
    /// skipped.
    pub fn list(&self) -> Result<Vec<SourceInfo>, SourceError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry
                .map_err(io::Error::from)
                .map_err(SourceError::io(&self.root))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            if !self.meta_path(&id).is_file() {
                continue;
            }
            match self.load_meta(&id) {
                Ok(meta) => sources.push(SourceInfo { id, meta }),
                Err(e) => warn!(source = %id, error = %e, "skipping source"),
            }
        }

        sources.sort_by(|a, b| a.meta.name.cmp(&b.meta.name).then_with(|| a.id.cmp(&b.id)));
        Ok(sources)
    }

    /// Read `source.json` for `id`.
    pub fn load_meta(&self, id: &str) -> Result<SourceMeta, SourceError> {
        if !is_single_component(id) {
            return Err(SourceError::NotFound(id.to_string()));
        }
        let path = self.meta_path(id);
        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(id.to_string()),
            _ => SourceError::Io {
                path: path.clone(),
                source: e,
            },
        })?;
        serde_json::from_str(&contents).map_err(|source| SourceError::BadMetadata { path, source })
    }

    /// Resolve the provider for a source already known to exist.
    pub fn open(&self, id: &str, meta: SourceMeta) -> Result<Source, SourceError> {
        if !self.exists(id) {
            return Err(SourceError::NotFound(id.to_string()));
        }
        let provider = self
            .registry
            .construct(&meta.provider, &self.source_dir(id), meta.provider_data.as_ref())
            .ok_or_else(|| SourceError::UnknownProvider(meta.provider.clone()))?;
        debug!(source = %id, provider = %meta.provider, "source opened");
        Ok(Source::new(id, meta, provider))
    }

    /// Load metadata and open in one step.
    pub fn open_by_id(&self, id: &str) -> Result<Source, SourceError> {
        let meta = self.load_meta(id)?;
        self.open(id, meta)
    }

    /// Create a new, empty source and return its id.
    pub fn create(&self, name: &str, provider_id: &str) -> Result<String, SourceError> {
        if !self.registry.contains(provider_id) {
            return Err(SourceError::UnknownProvider(provider_id.to_string()));
        }

        fs::create_dir_all(&self.root).map_err(SourceError::io(&self.root))?;

        let mut id = generate_source_id();
        while self.source_dir(&id).exists() {
            id = generate_source_id();
        }

        let dir = self.source_dir(&id);
        let projects = dir.join(PROJECTS_DIR);
        fs::create_dir_all(&projects).map_err(SourceError::io(&projects))?;

        let meta = SourceMeta::new(name, provider_id);
        let path = self.meta_path(&id);
        let contents = serde_json::to_string_pretty(&meta).map_err(|e| SourceError::BadMetadata {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, contents).map_err(SourceError::io(&path))?;

        info!(source = %id, name, provider = provider_id, "source created");
        Ok(id)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> (TempDir, SourceCatalog) {
        let tmp = TempDir::new().unwrap();
        let catalog = SourceCatalog::new(tmp.path().join("sources"), ProviderRegistry::builtin());
        (tmp, catalog)
    }

    fn write_source(catalog: &SourceCatalog, id: &str, json: &str) {
        let dir = catalog.source_dir(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(META_FILENAME), json).unwrap();
    }

    // --- Pure function tests ---

    #[test]
    fn default_sources_dir_is_reasonable() {
        assert!(default_sources_dir().ends_with("prm/sources"));
    }

    #[test]
    fn base36_rendering() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(46655), "zzz");
    }

    #[test]
    fn generated_ids_are_lowercase_base36() {
        let id = generate_source_id();
        assert!(id.len() > ID_SUFFIX_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn consecutive_ids_differ() {
        let ids: std::collections::HashSet<_> = (0..50).map(|_| generate_source_id()).collect();
        assert!(ids.len() > 1);
    }

    // --- Effect function tests ---

    #[test]
    fn missing_root_lists_nothing() {
        let (_tmp, catalog) = catalog();
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn list_skips_invalid_and_sorts_by_name() {
        let (_tmp, catalog) = catalog();
        write_source(&catalog, "b2", r#"{"name":"Beta","provider":"local"}"#);
        write_source(&catalog, "a1", r#"{"name":"Alpha","provider":"local"}"#);
        write_source(&catalog, "a0", r#"{"name":"Alpha","provider":"ftp"}"#);
        write_source(&catalog, "bad", r#"{"name":3}"#);
        write_source(&catalog, "junk", "not json");
        fs::create_dir_all(catalog.source_dir("empty")).unwrap();

        let listed: Vec<_> = catalog
            .list()
            .unwrap()
            .into_iter()
            .map(|s| (s.meta.name, s.id))
            .collect();

        assert_eq!(
            listed,
            vec![
                ("Alpha".to_string(), "a0".to_string()),
                ("Alpha".to_string(), "a1".to_string()),
                ("Beta".to_string(), "b2".to_string()),
            ]
        );
    }

    #[test]
    fn create_then_open() {
        let (_tmp, catalog) = catalog();

        let id = catalog.create("Work", "local").unwrap();

        assert!(catalog.exists(&id));
        assert!(catalog.source_dir(&id).join(PROJECTS_DIR).is_dir());
        let meta = catalog.load_meta(&id).unwrap();
        assert_eq!(meta, SourceMeta::new("Work", "local"));

        let source = catalog.open(&id, meta).unwrap();
        assert_eq!(source.name(), "Work");
        assert!(source.list_projects().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_unknown_provider() {
        let (_tmp, catalog) = catalog();
        let err = catalog.create("Work", "ftp").unwrap_err();
        assert!(matches!(err, SourceError::UnknownProvider(p) if p == "ftp"));
        assert!(!catalog.root().exists());
    }

    #[test]
    fn open_unknown_provider_fails() {
        let (_tmp, catalog) = catalog();
        write_source(&catalog, "x1", r#"{"name":"Remote","provider":"ftp"}"#);

        let err = catalog.open_by_id("x1").unwrap_err();

        assert!(matches!(err, SourceError::UnknownProvider(_)));
    }

    #[test]
    fn open_missing_source_is_not_found() {
        let (_tmp, catalog) = catalog();
        let err = catalog.open("ghost", SourceMeta::new("Ghost", "local")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
        assert!(matches!(catalog.load_meta("ghost"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn bad_metadata_is_reported() {
        let (_tmp, catalog) = catalog();
        write_source(&catalog, "bad", "{");
        assert!(matches!(catalog.load_meta("bad"), Err(SourceError::BadMetadata { .. })));
    }

    #[test]
    fn ids_cannot_escape_the_root() {
        let (_tmp, catalog) = catalog();
        fs::create_dir_all(catalog.root()).unwrap();
        assert!(!catalog.exists(".."));
        assert!(!catalog.exists("a/b"));
        assert!(matches!(catalog.load_meta("../x"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn opened_source_lists_its_projects() {
        let (_tmp, catalog) = catalog();
        let id = catalog.create("Work", "local").unwrap();
        let projects = catalog.source_dir(&id).join(PROJECTS_DIR);
        fs::create_dir_all(projects.join("blog")).unwrap();
        fs::write(projects.join("blog").join("index.md"), "#").unwrap();

        let source = catalog.open_by_id(&id).unwrap();

        assert_eq!(source.list_projects().unwrap()[0].name, "blog");
        let project = source.get_project("blog").unwrap().unwrap();
        assert_eq!(project.files[0].name, "index.md");
    }
}
