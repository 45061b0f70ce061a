//! Product adapter.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const PRODUCTS: &str = "/nitestmonitor/v2/products";
const QUERY: &str = "/nitestmonitor/v2/query-products";
const DELETE: &str = "/nitestmonitor/v2/delete-products";

/// Products carry the cleanup tag as a keyword.
#[derive(Debug, Clone, Copy)]
pub struct ProductAdapter;

#[async_trait]
impl ResourceAdapter for ProductAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::Product
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .contains("keywords", ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "products").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let product = Payload::from_properties(properties, &["keywords", "properties"])
            .set("name", name)
            .or_default("partNumber", name)
            .set(
                "keywords",
                support::keywords_with(properties.get("keywords"), ctx.cleanup_tag()),
            )
            .set("properties", support::string_properties(properties.get("properties")))
            .workspace(ctx)
            .into_value();

        let request = ApiRequest::post(PRODUCTS, json!({ "products": [product] }));
        match ctx.send(request).await {
            Ok(response) => Ok(support::batch_created(&response, "products", "failed")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx
            .send(ApiRequest::post(DELETE, json!({ "ids": [id] })))
            .await?;
        support::check_batch_deleted(&response, "failed")?;

        Ok(DeleteOutcome::Deleted(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, RecordingExecutor};

    const TAG: &str = "seedbed-example:demo";

    #[tokio::test]
    async fn test_create_defaults_part_number_and_tags() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", PRODUCTS, Reply::Json(json!({ "products": [{ "id": "prod-1" }] })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        let props = json!({ "family": "Sensors", "keywords": ["demo"] });
        let outcome = ProductAdapter
            .create(&ctx, "Widget", props.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(outcome, CreateOutcome::Created(String::from("prod-1")));
        assert_eq!(
            fake.requests()[0].body,
            Some(json!({ "products": [{
                "name": "Widget",
                "partNumber": "Widget",
                "family": "Sensors",
                "keywords": ["demo", TAG],
                "properties": {}
            }] }))
        );
    }

    #[tokio::test]
    async fn test_partial_failure_duplicate() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            PRODUCTS,
            Reply::Json(json!({
                "products": [],
                "failed": [{ "name": "Widget" }],
                "error": { "innerErrors": [{ "message": "Product with part number Widget already exists" }] }
            })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let outcome = ProductAdapter.create(&ctx, "Widget", &Map::new()).await.unwrap();
        assert_eq!(outcome, CreateOutcome::DuplicateUnresolved);
    }

    #[tokio::test]
    async fn test_delete_refused_is_error() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", QUERY, Reply::Json(json!({ "products": [{ "id": "prod-1" }] })));
        fake.reply("POST", DELETE, Reply::Json(json!({ "failed": ["prod-1"] })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        assert!(ProductAdapter.delete(&ctx, "Widget").await.is_err());
    }
}
