//! Workflow, work item and work order adapters.
//!
//! Work items and work orders share one batch API shape and carry the
//! cleanup tag in a comma-joined `tags` custom property. Workflows are
//! single-object resources with an embedded cleanup property.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload, CLEANUP_PROPERTY};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const WORKFLOWS: &str = "/niworkorder/v1/workflows";
const QUERY_WORKFLOWS: &str = "/niworkorder/v1/query-workflows";
const DELETE_WORKFLOWS: &str = "/niworkorder/v1/delete-workflows";

/// Name of the custom property holding comma-joined tags.
const TAGS_PROPERTY: &str = "tags";

/// Entries fetched per lookup before exact tag matching.
const MATCH_LIMIT: u32 = 100;

/// Returns true if an entry's comma-joined tags include `tag` as a whole.
fn carries_tag(entry: &Value, tag: &str) -> bool {
    entry
        .get("properties")
        .and_then(|p| p.get(TAGS_PROPERTY))
        .and_then(Value::as_str)
        .is_some_and(|tags| tags.split(',').map(str::trim).any(|t| t == tag))
}

/// Workflow adapter.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowAdapter;

#[async_trait]
impl ResourceAdapter for WorkflowAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::Workflow
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .equals(&format!("properties[\"{CLEANUP_PROPERTY}\"]"), ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY_WORKFLOWS, &filter, "workflows").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let mut custom = support::string_properties(properties.get("properties"));
        custom.insert(CLEANUP_PROPERTY.to_string(), Value::from(ctx.cleanup_tag()));

        let body = Payload::from_properties(properties, &["properties"])
            .set("name", name)
            .or_default("states", json!([]))
            .or_default("actions", json!([]))
            .set("properties", custom)
            .workspace(ctx)
            .into_value();

        match ctx.send(ApiRequest::post(WORKFLOWS, body)).await {
            Ok(response) => Ok(support::single_created(&response, "id")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx
            .send(ApiRequest::post(DELETE_WORKFLOWS, json!({ "ids": [id] })))
            .await?;
        support::check_batch_deleted(&response, "failedWorkflowIds")?;

        Ok(DeleteOutcome::Deleted(id))
    }
}

/// Endpoints and response keys of one batch work API.
#[derive(Debug, Clone, Copy)]
struct WorkApi {
    kind: ResourceType,
    create: &'static str,
    query: &'static str,
    delete: &'static str,
    /// Request collection key, also the query response key.
    collection: &'static str,
    created: &'static str,
    failed: &'static str,
    failed_ids: &'static str,
    default_type: Option<&'static str>,
    default_state: &'static str,
}

const WORK_ITEMS: WorkApi = WorkApi {
    kind: ResourceType::WorkItem,
    create: "/niworkitem/v1/workitems",
    query: "/niworkitem/v1/query-workitems",
    delete: "/niworkitem/v1/delete-workitems",
    collection: "workItems",
    created: "createdWorkItems",
    failed: "failedWorkItems",
    failed_ids: "failedWorkItemIds",
    default_type: Some("testplan"),
    default_state: "NEW",
};

const WORK_ORDERS: WorkApi = WorkApi {
    kind: ResourceType::WorkOrder,
    create: "/niworkorder/v1/workorders",
    query: "/niworkorder/v1/query-workorders",
    delete: "/niworkorder/v1/delete-workorders",
    collection: "workOrders",
    created: "createdWorkOrders",
    failed: "failedWorkOrders",
    failed_ids: "failedWorkOrderIds",
    default_type: None,
    default_state: "NEW",
};

impl WorkApi {
    async fn find(self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .contains(&format!("properties[\"{TAGS_PROPERTY}\"]"), ctx.cleanup_tag())
            .workspace(ctx.workspace());

        // Contains() is a substring match; keep only whole-tag matches
        let entries = ctx
            .query_entries(self.query, &filter, self.collection, MATCH_LIMIT)
            .await?;
        Ok(entries
            .iter()
            .filter(|entry| carries_tag(entry, ctx.cleanup_tag()))
            .find_map(support::id_of))
    }

    async fn create(
        self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let mut custom = support::string_properties(properties.get("properties"));
        let tags = support::joined_tags_with(
            properties.get(TAGS_PROPERTY).or_else(|| custom.get(TAGS_PROPERTY)),
            ctx.cleanup_tag(),
        );
        custom.insert(TAGS_PROPERTY.to_string(), Value::String(tags));

        let mut item = Payload::from_properties(properties, &["properties", TAGS_PROPERTY])
            .set("name", name)
            .or_default("state", self.default_state)
            .set("properties", custom)
            .workspace(ctx);
        if let Some(kind) = self.default_type {
            item = item.or_default("type", kind);
        }

        let mut body = Map::new();
        body.insert(self.collection.to_string(), json!([item.into_value()]));

        match ctx.send(ApiRequest::post(self.create, Value::Object(body))).await {
            Ok(response) => Ok(support::batch_created(&response, self.created, self.failed)),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx
            .send(ApiRequest::post(self.delete, json!({ "ids": [id] })))
            .await?;
        support::check_batch_deleted(&response, self.failed_ids)?;

        Ok(DeleteOutcome::Deleted(id))
    }
}

/// Work item adapter.
#[derive(Debug, Clone, Copy)]
pub struct WorkItemAdapter;

/// Work order adapter.
#[derive(Debug, Clone, Copy)]
pub struct WorkOrderAdapter;

#[async_trait]
impl ResourceAdapter for WorkItemAdapter {
    fn kind(&self) -> ResourceType {
        WORK_ITEMS.kind
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        WORK_ITEMS.find(ctx, name).await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        WORK_ITEMS.create(ctx, name, properties).await
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        WORK_ITEMS.delete(ctx, name).await
    }
}

#[async_trait]
impl ResourceAdapter for WorkOrderAdapter {
    fn kind(&self) -> ResourceType {
        WORK_ORDERS.kind
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        WORK_ORDERS.find(ctx, name).await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        WORK_ORDERS.create(ctx, name, properties).await
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        WORK_ORDERS.delete(ctx, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, RecordingExecutor};

    const TAG: &str = "seedbed-example:demo";

    #[tokio::test]
    async fn test_work_item_joins_tags() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            WORK_ITEMS.create,
            Reply::Json(json!({ "createdWorkItems": [{ "id": "wi-1" }] })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let props = json!({ "tags": ["calibration"], "part_number": "PN-1", "workflow_id": "wf-1" });
        let outcome = WorkItemAdapter
            .create(&ctx, "Calibrate", props.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(outcome, CreateOutcome::Created(String::from("wi-1")));
        let item = fake.requests()[0].body.clone().unwrap()["workItems"][0].clone();
        assert_eq!(item["properties"]["tags"], format!("calibration,{TAG}"));
        assert_eq!(item["type"], "testplan");
        assert_eq!(item["state"], "NEW");
        assert_eq!(item["workflowId"], "wf-1");
        assert!(item.get("tags").is_none());
    }

    #[tokio::test]
    async fn test_work_order_has_no_default_type() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            WORK_ORDERS.create,
            Reply::Json(json!({ "failedWorkOrders": [{ "message": "Work order already exists" }] })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let outcome = WorkOrderAdapter.create(&ctx, "WO-1", &Map::new()).await.unwrap();

        assert_eq!(outcome, CreateOutcome::DuplicateUnresolved);
        let order = fake.requests()[0].body.clone().unwrap()["workOrders"][0].clone();
        assert!(order.get("type").is_none());
        assert_eq!(order["properties"]["tags"], TAG);
    }

    #[tokio::test]
    async fn test_work_order_find_filters_by_tag() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            WORK_ORDERS.query,
            Reply::Json(json!({ "workOrders": [{ "id": "wo-1", "properties": { "tags": TAG } }] })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let found = WorkOrderAdapter.find_by_name(&ctx, "WO-1").await.unwrap();

        assert_eq!(found.as_deref(), Some("wo-1"));
        assert_eq!(
            fake.requests()[0].body.clone().unwrap()["filter"],
            format!(r#"name == "WO-1" && properties["tags"].Contains("{TAG}")"#)
        );
    }

    #[tokio::test]
    async fn test_find_ignores_documents_sharing_a_name_prefix() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            WORK_ITEMS.query,
            Reply::Json(json!({ "workItems": [
                { "id": "wi-other", "properties": { "tags": "calibration,seedbed-example:demo2" } },
                { "id": "wi-mine", "properties": { "tags": format!("calibration, {TAG}") } }
            ] })),
        );
        fake.reply(
            "POST",
            WORK_ORDERS.query,
            Reply::Json(json!({ "workOrders": [
                { "id": "wo-other", "properties": { "tags": "seedbed-example:demo2" } }
            ] })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let item = WorkItemAdapter.find_by_name(&ctx, "Calibrate").await.unwrap();
        assert_eq!(item.as_deref(), Some("wi-mine"));

        let deleted = WorkOrderAdapter.delete(&ctx, "WO-1").await.unwrap();
        assert_eq!(deleted, DeleteOutcome::NotFound);
        assert!(fake.requests().iter().all(|r| r.path != WORK_ORDERS.delete));
    }

    #[tokio::test]
    async fn test_workflow_embeds_cleanup_property() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", WORKFLOWS, Reply::Json(json!({ "id": "wf-1" })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        let outcome = WorkflowAdapter.create(&ctx, "Calibration", &Map::new()).await.unwrap();

        assert_eq!(outcome, CreateOutcome::Created(String::from("wf-1")));
        let body = fake.requests()[0].body.clone().unwrap();
        assert_eq!(body["properties"][CLEANUP_PROPERTY], TAG);
        assert_eq!(body["states"], json!([]));
    }
}
