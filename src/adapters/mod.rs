//! Per-resource-type adapters.
//!
//! Every [`ResourceType`] has exactly one adapter implementing
//! [`ResourceAdapter`]. Adapters shape request bodies, detect duplicates and
//! extract server identifiers. They never decide what a run does with an
//! outcome; that belongs to the engine.

mod asset;
mod data_table;
mod file;
mod location;
mod notebook;
mod product;
mod support;
mod system;
mod test_result;
mod work;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{ApiRequest, RequestExecutor};
use crate::config::ResourceType;
use crate::error::Result;

pub use support::{Filter, CLEANUP_PROPERTY};

use asset::AssetAdapter;
use data_table::DataTableAdapter;
use file::FileAdapter;
use location::LocationAdapter;
use notebook::NotebookAdapter;
use product::ProductAdapter;
use system::SystemAdapter;
use test_result::TestResultAdapter;
use work::{WorkItemAdapter, WorkOrderAdapter, WorkflowAdapter};

/// Outcome of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The resource was created with this identifier.
    Created(String),
    /// The service reported a duplicate and named the existing resource.
    DuplicateFound(String),
    /// The service reported a duplicate without naming it.
    DuplicateUnresolved,
    /// The service accepted the call but produced nothing usable.
    Failed(String),
}

/// Outcome of a delete call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The named resource was deleted.
    Deleted(String),
    /// Nothing matched; deleting an absent resource is not an error.
    NotFound,
    /// Every resource of the kind carrying the cleanup tag was deleted.
    BulkDeleted(Vec<String>),
}

/// Everything an adapter needs to talk to the service for one run.
#[derive(Clone, Copy)]
pub struct AdapterContext<'a> {
    executor: &'a dyn RequestExecutor,
    workspace: Option<&'a str>,
    cleanup_tag: &'a str,
}

impl std::fmt::Debug for AdapterContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext")
            .field("workspace", &self.workspace)
            .field("cleanup_tag", &self.cleanup_tag)
            .finish_non_exhaustive()
    }
}

impl<'a> AdapterContext<'a> {
    /// Creates a context.
    #[must_use]
    pub const fn new(
        executor: &'a dyn RequestExecutor,
        workspace: Option<&'a str>,
        cleanup_tag: &'a str,
    ) -> Self {
        Self {
            executor,
            workspace,
            cleanup_tag,
        }
    }

    /// Returns the workspace resources are created in, if any.
    #[must_use]
    pub const fn workspace(&self) -> Option<&'a str> {
        self.workspace
    }

    /// Returns the cleanup tag stamped on created resources.
    #[must_use]
    pub const fn cleanup_tag(&self) -> &'a str {
        self.cleanup_tag
    }

    /// Sends a request through the executor.
    ///
    /// # Errors
    ///
    /// Returns whatever the executor returns.
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        debug!("Sending {request}");
        self.executor.send(request).await
    }

    /// Runs a filtered query and returns every entry of `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query call fails.
    pub async fn query_entries(
        &self,
        path: &str,
        filter: &Filter,
        collection: &str,
        take: u32,
    ) -> Result<Vec<Value>> {
        let body = serde_json::json!({
            "filter": filter.build(),
            "take": take,
        });
        let mut response = self.send(ApiRequest::post(path, body)).await?;
        match response.get_mut(collection).map(Value::take) {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    /// Runs a filtered query and returns the identifiers of every match.
    ///
    /// # Errors
    ///
    /// Returns an error if the query call fails.
    pub async fn query_ids(
        &self,
        path: &str,
        filter: &Filter,
        collection: &str,
        take: u32,
    ) -> Result<Vec<String>> {
        let entries = self.query_entries(path, filter, collection, take).await?;
        Ok(entries.iter().filter_map(support::id_of).collect())
    }

    /// Runs a filtered query and returns the first matching identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the query call fails.
    pub async fn query_first_id(
        &self,
        path: &str,
        filter: &Filter,
        collection: &str,
    ) -> Result<Option<String>> {
        let ids = self.query_ids(path, filter, collection, 1).await?;
        Ok(ids.into_iter().next())
    }
}

/// The create/lookup/delete capability set of one resource kind.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// Kind this adapter handles.
    fn kind(&self) -> ResourceType;

    /// Looks up a resource by name within the context's scope.
    ///
    /// `Ok(None)` means the service answered and nothing matched.
    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>>;

    /// Creates a resource from resolved properties.
    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome>;

    /// Deletes a resource by name, or sweeps the kind when
    /// [`bulk_delete`](Self::bulk_delete) is true.
    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome>;

    /// Returns true if [`delete`](Self::delete) removes every resource of
    /// this kind carrying the cleanup tag in one call.
    fn bulk_delete(&self) -> bool {
        false
    }
}

const ASSET: AssetAdapter = AssetAdapter::new(ResourceType::Asset, "GENERIC");
const DUT: AssetAdapter = AssetAdapter::new(ResourceType::Dut, "DEVICE_UNDER_TEST");

/// Returns the adapter for a resource kind.
#[must_use]
pub fn adapter_for(kind: ResourceType) -> &'static dyn ResourceAdapter {
    match kind {
        ResourceType::Location => &LocationAdapter,
        ResourceType::Product => &ProductAdapter,
        ResourceType::System => &SystemAdapter,
        ResourceType::Asset => &ASSET,
        ResourceType::Dut => &DUT,
        ResourceType::TestResult => &TestResultAdapter,
        ResourceType::Workflow => &WorkflowAdapter,
        ResourceType::WorkItem => &WorkItemAdapter,
        ResourceType::WorkOrder => &WorkOrderAdapter,
        ResourceType::DataTable => &DataTableAdapter,
        ResourceType::File => &FileAdapter,
        ResourceType::Notebook => &NotebookAdapter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_its_own_adapter() {
        for kind in ResourceType::ALL {
            assert_eq!(adapter_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_bulk_kinds() {
        let bulk: Vec<ResourceType> = ResourceType::ALL
            .into_iter()
            .filter(|k| adapter_for(*k).bulk_delete())
            .collect();
        assert_eq!(bulk, vec![ResourceType::TestResult, ResourceType::File]);
    }
}
