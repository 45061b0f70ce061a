//! Document store for loading provisioning documents by name.
//!
//! Documents live under a root directory, either as
//! `<root>/<name>/config.yaml` or as `<root>/<name>.yaml`.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result, SeedbedError};

use super::document::{Document, DocumentSummary};
use super::validator::{DocumentValidator, ValidationReport};

/// File names tried inside a document directory.
const DIRECTORY_CONFIG_FILES: &[&str] = &["config.yaml", "config.yml"];

/// Extensions tried for flat document files.
const FLAT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Loads and validates documents from a root directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    /// Directory holding the documents.
    root: PathBuf,
    /// Validator applied to every load.
    validator: DocumentValidator,
}

impl DocumentLoader {
    /// Creates a loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            validator: DocumentValidator::new(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads and validates the document called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no document exists under that
    /// name and [`ConfigError::Invalid`] if it cannot be parsed or fails
    /// validation.
    pub fn load(&self, name: &str) -> Result<Document> {
        self.load_with_report(name).map(|(document, _)| document)
    }

    /// Loads a document and also returns the validation warnings.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentLoader::load`].
    pub fn load_with_report(&self, name: &str) -> Result<(Document, ValidationReport)> {
        let path = self
            .locate(name)
            .ok_or_else(|| SeedbedError::from(ConfigError::not_found(name)))?;
        self.load_path(&path)
    }

    /// Loads and validates a document from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist and
    /// [`ConfigError::Invalid`] if it cannot be parsed or fails validation.
    pub fn load_path(&self, path: &Path) -> Result<(Document, ValidationReport)> {
        info!("Loading document from: {}", path.display());

        if !path.is_file() {
            return Err(ConfigError::not_found(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid(path.display().to_string(), vec![format!("Failed to read file: {e}")])
        })?;

        self.parse_str(&content, &path.display().to_string())
    }

    /// Parses and validates a document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the YAML is malformed or the
    /// document fails validation.
    pub fn parse_str(&self, content: &str, source: &str) -> Result<(Document, ValidationReport)> {
        debug!("Parsing YAML document from {source}");

        let raw: Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::invalid(source, vec![format!("YAML parse error: {e}")]))?;

        self.validator.validate(raw, source)
    }

    /// Lists every loadable document, sorted by name.
    ///
    /// Listing is best-effort: documents that are missing or invalid are
    /// skipped silently.
    #[must_use]
    pub fn list(&self) -> Vec<DocumentSummary> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            warn!("Documents directory not readable: {}", self.root.display());
            return Vec::new();
        };

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let candidate = if path.is_dir() {
                path.file_name().and_then(|n| n.to_str()).map(String::from)
            } else if has_yaml_extension(&path) {
                path.file_stem().and_then(|n| n.to_str()).map(String::from)
            } else {
                None
            };

            if let Some(name) = candidate {
                names.insert(name);
            }
        }

        names
            .into_iter()
            .filter_map(|name| match self.load(&name) {
                Ok(document) => Some(document.summary()),
                Err(SeedbedError::Config(
                    ConfigError::NotFound { .. } | ConfigError::Invalid { .. },
                )) => {
                    debug!("Skipping unloadable document '{name}'");
                    None
                }
                Err(e) => {
                    warn!("Skipping document '{name}': {e}");
                    None
                }
            })
            .collect()
    }

    /// Resolves a document name to its file, if one exists.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            debug!("Rejecting unsafe document name: {name}");
            return None;
        }

        let dir = self.root.join(name);
        let nested = DIRECTORY_CONFIG_FILES.iter().map(|file| dir.join(file));
        let flat = FLAT_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{name}.{ext}")));

        nested.chain(flat).find(|candidate| candidate.is_file())
    }
}

/// Returns the default documents directory: `./documents` when present,
/// otherwise `<data dir>/seedbed/documents`.
#[must_use]
pub fn default_documents_dir() -> PathBuf {
    let local = PathBuf::from("documents");
    if local.is_dir() {
        return local;
    }

    dirs::data_dir().map_or(local, |dir| dir.join("seedbed").join("documents"))
}

fn has_yaml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FLAT_EXTENSIONS.contains(&e))
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.starts_with('.')
}
