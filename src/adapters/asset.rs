//! Asset adapter, shared by plain assets and devices under test.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const ASSETS: &str = "/niapm/v1/assets";
const QUERY: &str = "/niapm/v1/query-assets";
const DELETE: &str = "/niapm/v1/delete-assets";

/// Assets carry the cleanup tag as a keyword. The two kinds differ only in
/// the default asset type.
#[derive(Debug, Clone, Copy)]
pub struct AssetAdapter {
    kind: ResourceType,
    asset_type: &'static str,
}

impl AssetAdapter {
    pub(super) const fn new(kind: ResourceType, asset_type: &'static str) -> Self {
        Self { kind, asset_type }
    }
}

#[async_trait]
impl ResourceAdapter for AssetAdapter {
    fn kind(&self) -> ResourceType {
        self.kind
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("AssetName", name)
            .contains("Keywords", ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "assets").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let asset = Payload::from_properties(properties, &["keywords", "properties"])
            .set("name", name)
            .or_default("assetType", self.asset_type)
            .set(
                "keywords",
                support::keywords_with(properties.get("keywords"), ctx.cleanup_tag()),
            )
            .set("properties", support::string_properties(properties.get("properties")))
            .workspace(ctx)
            .into_value();

        let request = ApiRequest::post(ASSETS, json!({ "assets": [asset] }));
        match ctx.send(request).await {
            Ok(response) => Ok(support::batch_created(&response, "assets", "failed")),
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

    async fn created_asset_type(adapter: AssetAdapter, props: Value) -> Value {
        let fake = RecordingExecutor::new();
        fake.reply("POST", ASSETS, Reply::Json(json!({ "assets": [{ "id": "a-1" }] })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        adapter
            .create(&ctx, "Scope", props.as_object().unwrap())
            .await
            .unwrap();

        fake.requests()[0].body.clone().unwrap()["assets"][0]["assetType"].clone()
    }

    #[tokio::test]
    async fn test_asset_type_defaults_per_kind() {
        let asset = AssetAdapter::new(ResourceType::Asset, "GENERIC");
        let dut = AssetAdapter::new(ResourceType::Dut, "DEVICE_UNDER_TEST");

        assert_eq!(created_asset_type(asset, json!({})).await, "GENERIC");
        assert_eq!(created_asset_type(dut, json!({})).await, "DEVICE_UNDER_TEST");
        assert_eq!(
            created_asset_type(asset, json!({ "asset_type": "FIXTURE" })).await,
            "FIXTURE"
        );
    }

    #[tokio::test]
    async fn test_find_uses_asset_name_and_keywords() {
        let fake = RecordingExecutor::new();
        let ctx = AdapterContext::new(&fake, None, TAG);

        let found = AssetAdapter::new(ResourceType::Asset, "GENERIC")
            .find_by_name(&ctx, "Scope")
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(
            fake.requests()[0].body.clone().unwrap()["filter"],
            format!(r#"AssetName == "Scope" && Keywords.Contains("{TAG}")"#)
        );
    }
}
