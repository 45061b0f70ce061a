//! Virtual system adapter.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const VIRTUAL: &str = "/nisysmgmt/v1/virtual";
const QUERY: &str = "/nisysmgmt/v1/query-systems";
const REMOVE: &str = "/nisysmgmt/v1/remove-systems";

/// Systems are registered as virtual systems, named by alias, and carry
/// the cleanup tag as a keyword.
#[derive(Debug, Clone, Copy)]
pub struct SystemAdapter;

#[async_trait]
impl ResourceAdapter for SystemAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::System
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("alias", name)
            .contains("keywords", ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "data").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let body = Payload::from_properties(properties, &["keywords", "properties", "alias"])
            .set("alias", name)
            .set(
                "keywords",
                support::keywords_with(properties.get("keywords"), ctx.cleanup_tag()),
            )
            .set("properties", support::string_properties(properties.get("properties")))
            .workspace(ctx)
            .into_value();

        match ctx.send(ApiRequest::post(VIRTUAL, body)).await {
            Ok(response) => Ok(support::single_created(&response, "minionId")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx
            .send(ApiRequest::post(REMOVE, json!({ "tgts": [id], "force": true })))
            .await?;
        support::check_batch_deleted(&response, "failedIds")?;

        Ok(DeleteOutcome::Deleted(id))
    }
}
