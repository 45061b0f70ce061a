//! Document validation.
//!
//! Validation runs in two passes. The schema pass works on the raw parsed
//! tree so that every structural problem can be reported at once. The
//! reference pass runs on the typed document and checks that every
//! `${id_reference}` placeholder names a declared resource. Neither pass
//! touches the network.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::engine::collect_placeholders;
use crate::error::{ConfigError, Result};

use super::document::{Document, ResourceType, SUPPORTED_FORMAT_VERSIONS};

/// Required top-level document fields.
const REQUIRED_DOCUMENT_FIELDS: &[&str] = &["format_version", "name", "title", "resources"];

/// Required fields of every resource entry.
const REQUIRED_RESOURCE_FIELDS: &[&str] = &["type", "name", "properties", "id_reference"];

/// Validator for provisioning documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentValidator;

/// Validation result containing every problem found.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationReport {
    /// Fatal problems.
    pub errors: Vec<ValidationError>,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    /// Path of the offending field.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl DocumentValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a raw parsed document and converts it to a [`Document`].
    ///
    /// Returns the typed document together with any warnings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every schema problem, or
    /// every undefined reference if the schema pass succeeded.
    pub fn validate(&self, mut raw: Value, source: &str) -> Result<(Document, ValidationReport)> {
        normalize_format_version(&mut raw);

        let schema = self.validate_schema(&raw);
        if !schema.is_valid() {
            return Err(ConfigError::invalid(source, schema.messages()).into());
        }

        let document: Document = serde_json::from_value(raw)
            .map_err(|e| ConfigError::invalid(source, vec![format!("Malformed document: {e}")]))?;

        let mut report = self.validate_references(&document);
        if !report.is_valid() {
            return Err(ConfigError::invalid(source, report.messages()).into());
        }

        report.warnings.extend(schema.warnings);
        debug!(
            "Document '{}' passed validation with {} warning(s)",
            document.name,
            report.warnings.len()
        );

        Ok((document, report))
    }

    /// Checks the structure of a raw parsed document.
    #[must_use]
    pub fn validate_schema(&self, raw: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();

        let Some(root) = raw.as_object() else {
            report.error("", "Document must be a mapping");
            return report;
        };

        for field in REQUIRED_DOCUMENT_FIELDS {
            if !root.contains_key(*field) {
                report.error(*field, format!("Missing required field '{field}'"));
            }
        }

        if let Some(version) = root.get("format_version") {
            match version.as_str() {
                Some(v) if SUPPORTED_FORMAT_VERSIONS.contains(&v) => {}
                Some(v) => report.error(
                    "format_version",
                    format!(
                        "Unsupported format_version '{v}'. Supported: {}",
                        SUPPORTED_FORMAT_VERSIONS.join(", ")
                    ),
                ),
                None => report.error("format_version", "format_version must be a string"),
            }
        }

        for field in ["name", "title"] {
            if let Some(value) = root.get(field) {
                check_non_empty_string(value, field, &mut report);
            }
        }

        for field in ["description", "author"] {
            if let Some(value) = root.get(field) {
                if !value.is_string() && !value.is_null() {
                    report.error(field, format!("{field} must be a string"));
                }
            }
        }

        if let Some(tags) = root.get("tags") {
            check_tags(tags, "tags", &mut report);
        }

        if let Some(minutes) = root.get("estimated_setup_time_minutes") {
            if !minutes.is_u64() && !minutes.is_null() {
                report.error(
                    "estimated_setup_time_minutes",
                    "estimated_setup_time_minutes must be a non-negative integer",
                );
            }
        }

        match root.get("resources") {
            Some(Value::Array(resources)) => {
                if resources.is_empty() {
                    report.warn("Document declares no resources");
                }
                Self::validate_resources(resources, &mut report);
            }
            Some(_) => report.error("resources", "resources must be a list"),
            None => {}
        }

        report
    }

    /// Checks every resource entry.
    fn validate_resources(resources: &[Value], report: &mut ValidationReport) {
        let mut seen_refs: HashSet<&str> = HashSet::new();

        for (i, entry) in resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            let Some(resource) = entry.as_object() else {
                report.error(&prefix, "Resource entry must be a mapping");
                continue;
            };

            for field in REQUIRED_RESOURCE_FIELDS {
                if !resource.contains_key(*field) {
                    report.error(
                        format!("{prefix}.{field}"),
                        format!("Missing required resource field '{field}'"),
                    );
                }
            }

            if let Some(kind) = resource.get("type") {
                match kind.as_str() {
                    Some(k) => {
                        if let Err(message) = k.parse::<ResourceType>() {
                            report.error(format!("{prefix}.type"), message);
                        }
                    }
                    None => report.error(format!("{prefix}.type"), "type must be a string"),
                }
            }

            if let Some(name) = resource.get("name") {
                check_non_empty_string(name, &format!("{prefix}.name"), report);
            }

            if let Some(properties) = resource.get("properties") {
                if !properties.is_object() {
                    report.error(format!("{prefix}.properties"), "properties must be a mapping");
                }
            }

            if let Some(tags) = resource.get("tags") {
                check_tags(tags, &format!("{prefix}.tags"), report);
            }

            if let Some(id_ref) = resource.get("id_reference") {
                match id_ref.as_str() {
                    Some(r) if !is_identifier(r) => report.error(
                        format!("{prefix}.id_reference"),
                        format!(
                            "id_reference '{r}' is invalid. Must start with a letter or underscore \
                             and contain only letters, digits and underscores."
                        ),
                    ),
                    Some(r) => {
                        if !seen_refs.insert(r) {
                            report.error(
                                format!("{prefix}.id_reference"),
                                format!("Duplicate id_reference: {r}"),
                            );
                        }
                    }
                    None => report.error(
                        format!("{prefix}.id_reference"),
                        "id_reference must be a string",
                    ),
                }
            }
        }
    }

    /// Checks that every placeholder names a declared resource.
    ///
    /// Placeholders naming a resource declared later in the document are
    /// valid but reported as warnings: they stay unresolved at the time the
    /// referencing resource is provisioned.
    #[must_use]
    pub fn validate_references(&self, document: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();

        let positions: HashMap<&str, usize> = document
            .id_references()
            .into_iter()
            .enumerate()
            .map(|(i, id_reference)| (id_reference, i))
            .collect();

        for (i, resource) in document.resources.iter().enumerate() {
            for reference in collect_placeholders(&Value::Object(resource.properties.clone())) {
                match positions.get(reference.as_str()) {
                    None => report.error(
                        format!("resources[{i}].properties"),
                        format!(
                            "Undefined reference '${{{reference}}}' in resource '{}'",
                            resource.id_reference
                        ),
                    ),
                    Some(&target) if target >= i => report.warn(format!(
                        "resources[{i}] ('{}') references '{reference}', which is declared at or \
                         after it and will not be resolved when '{}' is provisioned",
                        resource.id_reference, resource.id_reference
                    )),
                    Some(_) => {}
                }
            }
        }

        report
    }
}

impl ValidationReport {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns every error as a display string.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Rewrites an unquoted numeric `format_version` (YAML `1.0`) as a string.
fn normalize_format_version(raw: &mut Value) {
    if let Some(version) = raw.get_mut("format_version") {
        if let Value::Number(n) = version {
            *version = Value::String(n.to_string());
        }
    }
}

fn check_non_empty_string(value: &Value, field: &str, report: &mut ValidationReport) {
    match value.as_str() {
        Some(s) if s.trim().is_empty() => report.error(field, format!("{field} cannot be empty")),
        Some(_) => {}
        None => report.error(field, format!("{field} must be a string")),
    }
}

fn check_tags(tags: &Value, field: &str, report: &mut ValidationReport) {
    match tags {
        Value::Array(items) if items.iter().all(Value::is_string) => {}
        Value::Null => {}
        _ => report.error(field, "tags must be a list of strings"),
    }
}

/// Returns true if `s` has identifier syntax: a letter or underscore
/// followed by letters, digits or underscores.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_raw() -> Value {
        json!({
            "format_version": "1.0",
            "name": "demo",
            "title": "Demo",
            "resources": [
                {
                    "type": "location",
                    "name": "Lab",
                    "id_reference": "lab",
                    "properties": {}
                },
                {
                    "type": "system",
                    "name": "Bench 1",
                    "id_reference": "bench",
                    "properties": { "location_id": "${lab}" }
                }
            ]
        })
    }

    #[test]
    fn test_valid_identifier() {
        assert!(is_identifier("lab"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("bench_2"));
        assert!(is_identifier("A"));
    }

    #[test]
    fn test_invalid_identifier() {
        assert!(!is_identifier(""));
        assert!(!is_identifier("2bench"));
        assert!(!is_identifier("bench-2"));
        assert!(!is_identifier("bench 2"));
        assert!(!is_identifier("${lab}"));
    }

    #[test]
    fn test_valid_document_passes() {
        let (document, report) = DocumentValidator::new().validate(valid_raw(), "demo").unwrap();
        assert_eq!(document.resources.len(), 2);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_each_missing_top_level_field_is_named() {
        for field in REQUIRED_DOCUMENT_FIELDS {
            let mut raw = valid_raw();
            raw.as_object_mut().unwrap().remove(*field);
            let report = DocumentValidator::new().validate_schema(&raw);
            assert!(
                report.errors.iter().any(|e| e.field == *field && e.message.contains(field)),
                "missing {field} was not reported: {report:?}"
            );
        }
    }

    #[test]
    fn test_schema_errors_are_collected_not_short_circuited() {
        let raw = json!({
            "format_version": "2.0",
            "name": "demo",
            "resources": [
                { "type": "spaceship", "name": "X", "id_reference": "1x", "properties": {} },
                "not a mapping",
                { "type": "asset", "name": "Y", "id_reference": "y" }
            ]
        });
        let report = DocumentValidator::new().validate_schema(&raw);
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"format_version"));
        assert!(fields.contains(&"resources[0].type"));
        assert!(fields.contains(&"resources[0].id_reference"));
        assert!(fields.contains(&"resources[1]"));
        assert!(fields.contains(&"resources[2].properties"));
        assert_eq!(report.error_count(), 6);
    }

    #[test]
    fn test_non_mapping_document() {
        let report = DocumentValidator::new().validate_schema(&json!(["a", "b"]));
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].message, "Document must be a mapping");
    }

    #[test]
    fn test_resources_must_be_a_list() {
        let mut raw = valid_raw();
        raw["resources"] = json!({ "lab": {} });
        let report = DocumentValidator::new().validate_schema(&raw);
        assert!(report.errors.iter().any(|e| e.field == "resources"));
    }

    #[test]
    fn test_duplicate_id_reference() {
        let mut raw = valid_raw();
        raw["resources"][1]["id_reference"] = json!("lab");
        let report = DocumentValidator::new().validate_schema(&raw);
        assert!(report.errors.iter().any(|e| e.message.contains("Duplicate id_reference: lab")));
    }

    #[test]
    fn test_numeric_format_version_is_accepted() {
        let mut raw = valid_raw();
        raw["format_version"] = json!(1.0);
        assert!(DocumentValidator::new().validate(raw, "demo").is_ok());
    }

    #[test]
    fn test_numeric_format_version_is_not_rounded() {
        for version in [json!(1.04), json!(0.96), json!(1)] {
            let mut raw = valid_raw();
            raw["format_version"] = version.clone();
            normalize_format_version(&mut raw);
            let report = DocumentValidator::new().validate_schema(&raw);
            assert!(
                report.errors.iter().any(|e| e.field == "format_version"),
                "{version} was accepted"
            );
        }
    }

    #[test]
    fn test_null_tags_are_empty() {
        let mut raw = valid_raw();
        raw["tags"] = Value::Null;
        raw["resources"][0]["tags"] = Value::Null;

        let (document, report) = DocumentValidator::new().validate(raw, "demo").unwrap();
        assert!(report.is_valid());
        assert!(document.tags.is_empty());
        assert!(document.resources[0].tags.is_empty());
    }

    #[test]
    fn test_undefined_references_are_all_reported() {
        let mut raw = valid_raw();
        raw["resources"][1]["properties"] = json!({
            "location_id": "${nowhere}",
            "nested": { "list": ["${ghost}", "plain"] }
        });

        let err = DocumentValidator::new().validate(raw, "demo").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("nowhere"));
        assert!(text.contains("ghost"));
        assert!(text.contains("2 problem(s)"));
    }

    #[test]
    fn test_forward_reference_is_a_warning() {
        let mut raw = valid_raw();
        raw["resources"][0]["properties"] = json!({ "parent_id": "${bench}" });

        let (_, report) = DocumentValidator::new().validate(raw, "demo").unwrap();
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("bench"));
    }

    #[test]
    fn test_reference_errors_wait_for_schema_pass() {
        let raw = json!({
            "format_version": "1.0",
            "name": "demo",
            "title": "Demo",
            "resources": [
                { "type": "bogus", "name": "A", "id_reference": "a", "properties": { "x": "${missing}" } }
            ]
        });

        let err = DocumentValidator::new().validate(raw, "demo").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("bogus"));
        assert!(!text.contains("missing"));
    }
}
