//! CLI module for Seedbed.
//!
//! This module provides the command-line interface for listing, validating,
//! provisioning and tearing down documents.

mod commands;
mod output;

pub use commands::{Cli, Commands, LookupFailureArg, OutputFormat};
pub use output::OutputFormatter;
