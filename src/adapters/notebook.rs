//! Notebook adapter.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload, CLEANUP_PROPERTY};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const NOTEBOOKS: &str = "/ninotebook/v1/notebook";
const QUERY: &str = "/ninotebook/v1/notebook/query";

#[derive(Debug, Clone, Copy)]
pub struct NotebookAdapter;

#[async_trait]
impl ResourceAdapter for NotebookAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::Notebook
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .equals(&format!("properties[\"{CLEANUP_PROPERTY}\"]"), ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "notebooks").await
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
            .set("properties", custom)
            .workspace(ctx)
            .into_value();

        match ctx.send(ApiRequest::post(NOTEBOOKS, body)).await {
            Ok(response) => Ok(support::single_created(&response, "id")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx.send(ApiRequest::delete(format!("{NOTEBOOKS}/{id}"))).await;
        Ok(support::missing_as_none(response)?
            .map_or(DeleteOutcome::NotFound, |_| DeleteOutcome::Deleted(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, RecordingExecutor};
    use serde_json::json;

    const TAG: &str = "seedbed-example:demo";

    #[tokio::test]
    async fn test_create_then_find_and_delete() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", NOTEBOOKS, Reply::Json(json!({ "id": "nb-1" })));
        fake.always("POST", QUERY, Reply::Json(json!({ "notebooks": [{ "id": "nb-1" }] })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        let outcome = NotebookAdapter.create(&ctx, "Analysis", &Map::new()).await.unwrap();
        assert_eq!(outcome, CreateOutcome::Created(String::from("nb-1")));

        let found = NotebookAdapter.find_by_name(&ctx, "Analysis").await.unwrap();
        assert_eq!(found.as_deref(), Some("nb-1"));

        let deleted = NotebookAdapter.delete(&ctx, "Analysis").await.unwrap();
        assert_eq!(deleted, DeleteOutcome::Deleted(String::from("nb-1")));
        assert_eq!(fake.requests_with("DELETE").len(), 1);
    }
}
