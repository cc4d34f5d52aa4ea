//! Playbook parser and loaders.
//!
//! Parses JSON (or YAML) playbook documents into [`Playbook`] structs and
//! resolves sub-playbook references.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::Playbook;
use crate::error::LoadError;

/// Source of playbook documents.
pub trait GraphLoader: Send + Sync {
    /// Load the playbook a playbook step names by `playbook_id`.
    fn load(&self, reference: &str) -> Result<Playbook, LoadError>;

    /// Load a top-level playbook named on the command line.
    fn load_root(&self, reference: &str) -> Result<Playbook, LoadError> {
        self.load(reference)
    }
}

/// Loads playbooks from the filesystem.
///
/// Top-level playbooks are paths used as given. Sub-playbook references are
/// resolved only under `base_dir`; a reference without an extension also
/// tries `.json`, `.yaml` and `.yml`.
#[derive(Debug, Clone)]
pub struct FsGraphLoader {
    base_dir: PathBuf,
}

impl FsGraphLoader {
    /// Create a loader resolving references against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Resolve a sub-playbook reference to an existing file under `base_dir`.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let base = self.base_dir.join(reference);
        if base.is_file() {
            return Some(base);
        }

        ["json", "yaml", "yml"]
            .iter()
            .map(|ext| {
                let mut name = base.clone().into_os_string();
                name.push(".");
                name.push(ext);
                PathBuf::from(name)
            })
            .find(|candidate| candidate.is_file())
    }
}

impl GraphLoader for FsGraphLoader {
    fn load(&self, reference: &str) -> Result<Playbook, LoadError> {
        let path = self
            .resolve(reference)
            .ok_or_else(|| LoadError::NotFound(self.base_dir.join(reference)))?;
        parse_playbook(&path)
    }

    fn load_root(&self, reference: &str) -> Result<Playbook, LoadError> {
        parse_playbook(Path::new(reference))
    }
}

/// Serves playbooks from memory, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct MapGraphLoader {
    playbooks: HashMap<String, Playbook>,
}

impl MapGraphLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a playbook under `reference`.
    pub fn with(mut self, reference: impl Into<String>, playbook: Playbook) -> Self {
        self.playbooks.insert(reference.into(), playbook);
        self
    }

    /// Register a playbook under `reference`.
    pub fn insert(&mut self, reference: impl Into<String>, playbook: Playbook) {
        self.playbooks.insert(reference.into(), playbook);
    }
}

impl GraphLoader for MapGraphLoader {
    fn load(&self, reference: &str) -> Result<Playbook, LoadError> {
        self.playbooks
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(PathBuf::from(reference)))
    }
}

/// Parse a playbook from a file.
pub fn parse_playbook(path: &Path) -> Result<Playbook, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;

    let is_yaml = path.extension().map_or(false, |e| e == "yaml" || e == "yml");
    let playbook: Playbook = if is_yaml {
        serde_yaml::from_str(&content)
            .map_err(|e| LoadError::Parse { path: path.to_path_buf(), message: e.to_string() })?
    } else {
        serde_json::from_str(&content)
            .map_err(|e| LoadError::Parse { path: path.to_path_buf(), message: e.to_string() })?
    };

    validate_playbook(&playbook)?;
    tracing::debug!(path = ?path, id = %playbook.id, steps = playbook.step_count(), "Loaded playbook");
    Ok(playbook)
}

/// Parse a playbook from a string, accepting JSON or YAML.
pub fn parse_playbook_str(content: &str) -> Result<Playbook, LoadError> {
    let path = PathBuf::from("<string>");
    let playbook: Playbook = if content.trim_start().starts_with('{') {
        serde_json::from_str(content)
            .map_err(|e| LoadError::Parse { path, message: e.to_string() })?
    } else {
        serde_yaml::from_str(content)
            .map_err(|e| LoadError::Parse { path, message: e.to_string() })?
    };
    validate_playbook(&playbook)?;
    Ok(playbook)
}

/// Validate a playbook for structural errors.
///
/// Edges are not checked here; a dangling edge fails during traversal.
fn validate_playbook(playbook: &Playbook) -> Result<(), LoadError> {
    if playbook.id.is_empty() {
        return Err(LoadError::Invalid("playbook id cannot be empty".to_string()));
    }

    if playbook.workflow.is_empty() {
        return Err(LoadError::Invalid(format!("playbook '{}' has no workflow steps", playbook.id)));
    }

    if playbook.workflow_start.is_empty() {
        return Err(LoadError::Invalid(format!("playbook '{}' has no workflow_start", playbook.id)));
    }

    Ok(())
}

/// Expand a list of paths into playbook files.
///
/// Directories contribute every `.json`, `.yaml` and `.yml` file they
/// contain directly, sorted by name.
pub fn discover_playbooks(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for path in paths {
        if !path.is_dir() {
            found.push(path.clone());
            continue;
        }

        let mut entries: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .map(|entry| entry.into_path())
            .filter(|p| {
                p.is_file()
                    && p.extension().map_or(false, |e| e == "json" || e == "yaml" || e == "yml")
            })
            .collect();

        if entries.is_empty() {
            tracing::warn!(path = ?path, "No playbooks found in directory");
        }
        found.append(&mut entries);
    }

    found
}
