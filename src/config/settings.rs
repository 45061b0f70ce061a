//! Runtime settings for talking to the resource service.
//!
//! Values come from command-line flags with environment fallbacks (see the
//! CLI), after an optional `.env` file has been loaded.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result, SeedbedError};

/// Environment variable holding the service base URL.
pub const API_URL_VAR: &str = "SEEDBED_API_URL";

/// Environment variable holding the service API key.
pub const API_KEY_VAR: &str = "SEEDBED_API_KEY";

/// Default tool name used in cleanup tags.
pub const DEFAULT_TOOL_NAME: &str = "seedbed";

/// Connection and scoping settings for a run.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Base URL of the resource service.
    pub api_url: Option<String>,
    /// API key for the resource service.
    pub api_key: Option<String>,
    /// Workspace every created resource is placed in.
    pub workspace: Option<String>,
    /// Tool name used in the cleanup tag.
    pub tool_name: String,
}

impl Settings {
    /// Creates settings with the default tool name and nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tool_name: String::from(DEFAULT_TOOL_NAME),
            ..Self::default()
        }
    }

    /// Returns the API URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if no URL was supplied.
    pub fn require_api_url(&self) -> Result<&str> {
        non_empty(self.api_url.as_deref()).ok_or_else(|| missing(API_URL_VAR))
    }

    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if no key was supplied.
    pub fn require_api_key(&self) -> Result<&str> {
        non_empty(self.api_key.as_deref()).ok_or_else(|| missing(API_KEY_VAR))
    }
}

/// Loads a `.env` file from `dir` (or the current directory) if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(dir: Option<&Path>) -> Result<()> {
    let env_path = dir.map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            ConfigError::invalid(env_path.display().to_string(), vec![format!("Failed to load .env file: {e}")])
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn missing(name: &str) -> SeedbedError {
    ConfigError::MissingSetting {
        name: name.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.tool_name, "seedbed");
        assert!(settings.workspace.is_none());
    }

    #[test]
    fn test_missing_url_names_variable() {
        let settings = Settings::new();
        let err = settings.require_api_url().unwrap_err();
        assert!(err.to_string().contains(API_URL_VAR));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let settings = Settings {
            api_key: Some(String::from("   ")),
            ..Settings::new()
        };
        assert!(settings.require_api_key().is_err());
    }

    #[test]
    fn test_present_values() {
        let settings = Settings {
            api_url: Some(String::from("https://service.example")),
            api_key: Some(String::from("secret")),
            ..Settings::new()
        };
        assert_eq!(settings.require_api_url().unwrap(), "https://service.example");
        assert_eq!(settings.require_api_key().unwrap(), "secret");
    }

    #[test]
    fn test_load_dotenv_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dotenv(Some(dir.path())).is_ok());
    }
}
