//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{API_KEY_VAR, API_URL_VAR, DEFAULT_TOOL_NAME};
use crate::engine::LookupFailurePolicy;

/// Seedbed - Declarative provisioning and teardown of example resource graphs.
#[derive(Parser, Debug)]
#[command(name = "seedbed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding provisioning documents.
    #[arg(long, global = true, env = "SEEDBED_DOCUMENTS_DIR")]
    pub documents_dir: Option<PathBuf>,

    /// Base URL of the resource service.
    #[arg(long, global = true, env = API_URL_VAR)]
    pub api_url: Option<String>,

    /// API key for the resource service.
    #[arg(long, global = true, env = API_KEY_VAR, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Workspace that scopes lookups and receives created resources.
    #[arg(long, global = true, env = "SEEDBED_WORKSPACE")]
    pub workspace: Option<String>,

    /// Tool name used in the cleanup tag.
    #[arg(long, global = true, env = "SEEDBED_TOOL_NAME", default_value = DEFAULT_TOOL_NAME)]
    pub tool_name: String,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available documents.
    List,

    /// Show a document and its resources.
    Info {
        /// Document name.
        name: String,
    },

    /// Validate a document.
    Validate {
        /// Document name.
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        name: Option<String>,

        /// Validate a document file instead of a named document.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Create every resource of a document, in declared order.
    Provision {
        /// Document name.
        name: String,

        /// Resolve and report without contacting the service.
        #[arg(long)]
        dry_run: bool,

        /// Fail resources that still hold unresolved references.
        #[arg(long)]
        strict_references: bool,

        /// What to do when an existence check fails.
        #[arg(long, value_enum, default_value = "fail")]
        lookup_failure: LookupFailureArg,

        /// Write the JSON run report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Delete every resource of a document, in reverse order.
    Delete {
        /// Document name.
        name: String,

        /// Report without contacting the service.
        #[arg(long)]
        dry_run: bool,

        /// Only delete resources declaring one of these tags. Test results
        /// and files are swept as a whole: one matching resource removes every
        /// result or file carrying the document's cleanup tag.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Write the JSON run report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// `--lookup-failure` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LookupFailureArg {
    /// Record the resource as failed.
    #[default]
    Fail,
    /// Treat the resource as missing and create it.
    Create,
}

impl From<LookupFailureArg> for LookupFailurePolicy {
    fn from(arg: LookupFailureArg) -> Self {
        match arg {
            LookupFailureArg::Fail => Self::Fail,
            LookupFailureArg::Create => Self::TreatAsMissing,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
