//! Run results.
//!
//! One [`ResourceResult`] is produced per resource per run, in walk order,
//! and collected into a [`RunReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{Document, DocumentHasher, ResourceDecl, ResourceType};
use crate::error::{ApiError, SeedbedError};

/// What happened to one resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// The resource was created.
    Created,
    /// Nothing was done; see the note.
    Skipped,
    /// The resource could not be handled; see the error.
    Failed,
    /// The resource was deleted.
    Deleted,
}

impl Action {
    /// Returns the display name of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceResult {
    /// Document-local reference of the resource.
    pub id_reference: String,
    /// Kind of resource.
    pub resource_type: ResourceType,
    /// Declared name.
    pub resource_name: String,
    /// What happened.
    pub action: Action,
    /// Server identifier, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Failure detail for `Failed` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Explanation for `Skipped` results and sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ResourceResult {
    fn new(decl: &ResourceDecl, action: Action) -> Self {
        Self {
            id_reference: decl.id_reference.clone(),
            resource_type: decl.resource_type,
            resource_name: decl.name.clone(),
            action,
            server_id: None,
            error: None,
            note: None,
        }
    }

    /// A created resource.
    #[must_use]
    pub fn created(decl: &ResourceDecl, server_id: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            ..Self::new(decl, Action::Created)
        }
    }

    /// A deleted resource.
    #[must_use]
    pub fn deleted(decl: &ResourceDecl, server_id: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
            ..Self::new(decl, Action::Deleted)
        }
    }

    /// A skipped resource, with the server id when one was discovered.
    #[must_use]
    pub fn skipped(decl: &ResourceDecl, server_id: Option<String>, note: impl Into<String>) -> Self {
        Self {
            server_id,
            note: Some(note.into()),
            ..Self::new(decl, Action::Skipped)
        }
    }

    /// A failed resource.
    #[must_use]
    pub fn failed(decl: &ResourceDecl, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(decl, Action::Failed)
        }
    }

    /// Attaches a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Which walk produced a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Declared-order creation.
    Provision,
    /// Reverse-order deletion.
    Teardown,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provision => write!(f, "provision"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// Ordered results of one provisioning or teardown run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    /// Unique identifier of this run, also recorded on its log span.
    pub run_id: Uuid,
    /// Walk that produced this report.
    pub operation: Operation,
    /// Document name.
    pub document: String,
    /// Fingerprint of the document revision that was run.
    pub fingerprint: String,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished or aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Results in walk order.
    pub results: Vec<ResourceResult>,
}

impl RunReport {
    /// Starts a report for a run over `document`.
    #[must_use]
    pub fn start(operation: Operation, document: &Document, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            operation,
            document: document.name.clone(),
            fingerprint: DocumentHasher::new().fingerprint(document),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::with_capacity(document.resources.len()),
        }
    }

    /// Appends a result.
    pub fn push(&mut self, result: ResourceResult) {
        self.results.push(result);
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Returns the number of results with `action`.
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }

    /// Returns true if any resource failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.count(Action::Failed) > 0
    }

    /// Returns the wall-clock duration in milliseconds, once finished.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Returns a one-line summary such as `2 created, 1 skipped, 0 failed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let primary = match self.operation {
            Operation::Provision => Action::Created,
            Operation::Teardown => Action::Deleted,
        };

        format!(
            "{} {primary}, {} skipped, {} failed",
            self.count(primary),
            self.count(Action::Skipped),
            self.count(Action::Failed)
        )
    }
}

/// A walk stopped by a fatal error.
///
/// The report holds every result recorded before the abort, including a
/// `Failed` entry for the resource that hit the error.
#[derive(Debug, Error)]
#[error("{} of '{}' aborted after {} resource(s): {source}", .report.operation, .report.document, .report.results.len())]
pub struct RunAborted {
    /// Partial report.
    pub report: RunReport,
    /// The fatal error.
    pub source: SeedbedError,
}

/// Renders an error for a `Failed` result.
///
/// Service error bodies often carry more than their message; the error
/// name and any inner error messages are appended when present.
#[must_use]
pub fn describe_failure(err: &SeedbedError) -> String {
    let mut text = err.to_string();

    let Some(body) = err.as_api().and_then(ApiError::body) else {
        return text;
    };
    let error = body.get("error").unwrap_or(body);

    if let Some(name) = error.get("name").and_then(Value::as_str) {
        text.push_str(&format!(" [{name}]"));
    }

    let inner: Vec<&str> = error
        .get("innerErrors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if !inner.is_empty() {
        text.push_str(&format!(" ({})", inner.join("; ")));
    }

    text
}
