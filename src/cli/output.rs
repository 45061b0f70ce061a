//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{Document, DocumentHasher, DocumentSummary, ValidationReport};
use crate::engine::{Action, RunReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Document row for table display.
#[derive(Tabled)]
struct DocumentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Setup (min)")]
    minutes: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

/// Declared resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Reference")]
    id_reference: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

/// Run result row for table display.
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Server ID")]
    server_id: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the document listing.
    #[must_use]
    pub fn format_list(&self, documents: &[DocumentSummary]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(documents).unwrap_or_default(),
            OutputFormat::Text => {
                if documents.is_empty() {
                    return format!("{} No documents found.\n", "⚠".yellow());
                }

                let rows: Vec<DocumentRow> = documents
                    .iter()
                    .map(|d| DocumentRow {
                        name: d.name.clone(),
                        title: Self::truncate(&d.title, 40),
                        resources: d.resource_count,
                        minutes: d
                            .estimated_setup_time_minutes
                            .map_or_else(|| String::from("-"), |m| m.to_string()),
                        tags: d.tags.join(", "),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                let _ = write!(output, "\n\n{} document(s)\n", documents.len());
                output
            }
        }
    }

    /// Formats a document's details.
    #[must_use]
    pub fn format_document(&self, document: &Document, tool_name: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(document).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = writeln!(output, "\n{} ({})", document.title.bold(), document.name);
                if let Some(description) = &document.description {
                    let _ = writeln!(output, "   {description}");
                }
                if let Some(author) = &document.author {
                    let _ = writeln!(output, "   Author: {author}");
                }
                if let Some(minutes) = document.estimated_setup_time_minutes {
                    let _ = writeln!(output, "   Estimated setup: {minutes} min");
                }
                let _ = writeln!(output, "   Cleanup tag: {}", document.cleanup_tag(tool_name));
                let fingerprint = DocumentHasher::new().fingerprint(document);
                let _ = writeln!(
                    output,
                    "   Fingerprint: {}\n",
                    DocumentHasher::short(&fingerprint)
                );

                let rows: Vec<ResourceRow> = document
                    .resources
                    .iter()
                    .enumerate()
                    .map(|(i, r)| ResourceRow {
                        index: i + 1,
                        resource_type: r.resource_type.to_string(),
                        name: Self::truncate(&r.name, 40),
                        id_reference: r.id_reference.clone(),
                        tags: r.tags.join(", "),
                    })
                    .collect();

                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats a validation outcome.
    #[must_use]
    pub fn format_validation(&self, source: &str, report: &ValidationReport) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "document": source,
                    "valid": report.is_valid(),
                    "errors": report.messages(),
                    "warnings": report.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if report.is_valid() {
                    format!("{} {source} is valid\n", "✓".green())
                } else {
                    format!(
                        "{} {source} is invalid ({} problem(s))\n",
                        "✗".red(),
                        report.error_count()
                    )
                };

                for error in report.messages() {
                    let _ = writeln!(output, "   - {error}");
                }

                if !report.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &report.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats a document that failed to load, listing every problem.
    #[must_use]
    pub fn format_invalid(&self, source: &str, errors: &[String]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "document": source,
                    "valid": false,
                    "errors": errors,
                    "warnings": [],
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!(
                    "{} {source} is invalid ({} problem(s))\n",
                    "✗".red(),
                    errors.len()
                );
                for error in errors {
                    let _ = writeln!(output, "   - {error}");
                }
                output
            }
        }
    }

    /// Formats a run report.
    #[must_use]
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats a run report as text.
    fn format_report_text(report: &RunReport) -> String {
        let mut output = String::new();

        let mode = if report.dry_run { " (dry run)" } else { "" };
        let _ = write!(
            output,
            "\n{} {}{mode}\n   Run: {}\n   Fingerprint: {}\n\n",
            report.operation.to_string().bold(),
            report.document,
            report.run_id,
            DocumentHasher::short(&report.fingerprint)
        );

        if report.results.is_empty() {
            output.push_str("   No resources.\n");
            return output;
        }

        let rows: Vec<ResultRow> = report
            .results
            .iter()
            .map(|r| ResultRow {
                resource: format!("{} ({})", r.resource_name, r.id_reference),
                resource_type: r.resource_type.to_string(),
                action: Self::format_action(r.action),
                server_id: r.server_id.clone().unwrap_or_else(|| String::from("-")),
                detail: Self::truncate(
                    r.error.as_deref().or(r.note.as_deref()).unwrap_or(""),
                    60,
                ),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let status = if report.has_failures() {
            "✗".red()
        } else {
            "✓".green()
        };
        let _ = write!(output, "\n{status} {}", report.summary());
        if let Some(ms) = report.duration_ms() {
            let _ = write!(output, " in {ms} ms");
        }
        output.push('\n');

        output
    }

    /// Formats an action with color.
    fn format_action(action: Action) -> String {
        match action {
            Action::Created => "+created".green().to_string(),
            Action::Deleted => "-deleted".red().to_string(),
            Action::Skipped => "skipped".dimmed().to_string(),
            Action::Failed => "failed".red().bold().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
