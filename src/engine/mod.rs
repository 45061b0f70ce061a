//! Provisioning and teardown engine.
//!
//! This module walks a validated document:
//! - Provisioning, in declared order, resolving references as it goes
//! - Teardown, in reverse declared order, optionally filtered by tag
//!
//! Both walks are strictly sequential. Every adapter call is awaited before
//! the walk moves on, since later resources consume earlier identifiers.

mod provision;
mod resolver;
mod result;
mod teardown;

use serde::{Deserialize, Serialize};

use crate::api::RequestExecutor;
use crate::config::DEFAULT_TOOL_NAME;

pub use resolver::{
    collect_placeholders, parse_placeholder, resolve, resolve_map, synthetic_id, IdMap,
    SYNTHETIC_ID_PREFIX,
};
pub use result::{describe_failure, Action, Operation, ResourceResult, RunAborted, RunReport};

/// What to do when an existence check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Record the resource as failed without attempting creation.
    #[default]
    Fail,
    /// Treat the resource as missing and attempt creation.
    TreatAsMissing,
}

/// Options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Resolve and record without any network call.
    pub dry_run: bool,
    /// Workspace that scopes lookups and receives created resources.
    pub workspace: Option<String>,
    /// Tool name used in the cleanup tag.
    pub tool_name: String,
    /// Behaviour when an existence check fails.
    pub lookup_failure: LookupFailurePolicy,
    /// Fail resources whose properties still hold unresolved references.
    pub strict_references: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            workspace: None,
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            lookup_failure: LookupFailurePolicy::default(),
            strict_references: false,
        }
    }
}

impl RunOptions {
    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the workspace.
    #[must_use]
    pub fn with_workspace(mut self, workspace: Option<String>) -> Self {
        self.workspace = workspace;
        self
    }

    /// Sets the tool name.
    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    /// Sets the lookup failure policy.
    #[must_use]
    pub const fn with_lookup_failure(mut self, policy: LookupFailurePolicy) -> Self {
        self.lookup_failure = policy;
        self
    }

    /// Sets strict reference handling.
    #[must_use]
    pub const fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }
}

/// Runs documents against a resource service.
pub struct Engine<'a> {
    executor: &'a dyn RequestExecutor,
    options: RunOptions,
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Engine<'a> {
    /// Creates an engine.
    #[must_use]
    pub const fn new(executor: &'a dyn RequestExecutor, options: RunOptions) -> Self {
        Self { executor, options }
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }
}
