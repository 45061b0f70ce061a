//! Configuration module for Seedbed.
//!
//! This module handles everything that happens before the network is touched:
//! - Loading provisioning documents by name
//! - Schema and reference validation
//! - Fingerprinting documents for run reports
//! - Connection settings

mod document;
mod hash;
mod loader;
mod settings;
mod validator;

pub use document::{
    cleanup_tag, Document, DocumentSummary, ResourceDecl, ResourceType, SUPPORTED_FORMAT_VERSIONS,
};
pub use hash::DocumentHasher;
pub use loader::{default_documents_dir, DocumentLoader};
pub use settings::{load_dotenv, Settings, API_KEY_VAR, API_URL_VAR, DEFAULT_TOOL_NAME};
pub use validator::{is_identifier, DocumentValidator, ValidationError, ValidationReport};
