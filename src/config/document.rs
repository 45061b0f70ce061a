//! Document types for declarative resource graphs.
//!
//! A document describes, in order, every resource a run should stand up.
//! These types map one-to-one onto the YAML file and are read-only once
//! loaded.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Document format versions this engine understands.
pub const SUPPORTED_FORMAT_VERSIONS: &[&str] = &["1.0"];

/// A validated provisioning document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Document format version.
    pub format_version: String,
    /// Unique document name; also the suffix of the cleanup tag.
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Document-level tags.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Rough setup time shown in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_setup_time_minutes: Option<u32>,
    /// Resources in declared (and therefore dependency) order.
    pub resources: Vec<ResourceDecl>,
}

/// One resource declaration inside a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDecl {
    /// Kind of resource.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Name the resource is created under.
    pub name: String,
    /// Kind-specific properties; may contain `${id_reference}` placeholders.
    pub properties: Map<String, Value>,
    /// Document-local identifier used by placeholders elsewhere.
    pub id_reference: String,
    /// Resource-level tags, used by teardown filters.
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Reads an explicit YAML `null` (an empty `tags:` key) as no tags.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The closed set of resource kinds the engine can provision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A physical or logical location.
    Location,
    /// A product (part number) definition.
    Product,
    /// A managed (virtual) system.
    System,
    /// A tracked asset.
    Asset,
    /// A device under test; an asset with the DUT asset type.
    Dut,
    /// A test result.
    TestResult,
    /// A work-order workflow definition.
    Workflow,
    /// A work item.
    WorkItem,
    /// A work order.
    WorkOrder,
    /// A data table.
    DataTable,
    /// A stored file.
    File,
    /// A notebook.
    Notebook,
}

impl ResourceType {
    /// Every supported kind, in a stable order.
    pub const ALL: [Self; 12] = [
        Self::Location,
        Self::Product,
        Self::System,
        Self::Asset,
        Self::Dut,
        Self::TestResult,
        Self::Workflow,
        Self::WorkItem,
        Self::WorkOrder,
        Self::DataTable,
        Self::File,
        Self::Notebook,
    ];

    /// Returns the document spelling of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Product => "product",
            Self::System => "system",
            Self::Asset => "asset",
            Self::Dut => "dut",
            Self::TestResult => "test_result",
            Self::Workflow => "workflow",
            Self::WorkItem => "work_item",
            Self::WorkOrder => "work_order",
            Self::DataTable => "data_table",
            Self::File => "file",
            Self::Notebook => "notebook",
        }
    }

    /// Returns the document spellings of every supported kind.
    #[must_use]
    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unsupported resource type '{s}'. Expected one of: {}",
                    Self::supported_names().join(", ")
                )
            })
    }
}

/// Listing entry for a document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    /// Document name.
    pub name: String,
    /// Document title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional author.
    pub author: Option<String>,
    /// Document-level tags.
    pub tags: Vec<String>,
    /// Rough setup time.
    pub estimated_setup_time_minutes: Option<u32>,
    /// Number of declared resources.
    pub resource_count: usize,
}

impl Document {
    /// Returns the cleanup tag stamped on everything this document creates.
    #[must_use]
    pub fn cleanup_tag(&self, tool_name: &str) -> String {
        cleanup_tag(tool_name, &self.name)
    }

    /// Returns the declared `id_reference` values in order.
    #[must_use]
    pub fn id_references(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.id_reference.as_str()).collect()
    }

    /// Builds the listing summary for this document.
    #[must_use]
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            tags: self.tags.clone(),
            estimated_setup_time_minutes: self.estimated_setup_time_minutes,
            resource_count: self.resources.len(),
        }
    }
}

impl ResourceDecl {
    /// Returns true if any of `filter` appears in this resource's tags.
    #[must_use]
    pub fn matches_any_tag(&self, filter: &[String]) -> bool {
        filter.iter().any(|f| self.tags.contains(f))
    }
}

/// Builds the cleanup tag `<tool>-example:<document>`.
#[must_use]
pub fn cleanup_tag(tool_name: &str, document_name: &str) -> String {
    format!("{tool_name}-example:{document_name}")
}
