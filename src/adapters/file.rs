//! File adapter.
//!
//! Uploads are JSON documents with inline content; the file name and the
//! cleanup tag are stored as file properties.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload, CLEANUP_PROPERTY};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const UPLOAD: &str = "/nifile/v1/service-groups/Default/upload-files";
const QUERY: &str = "/nifile/v1/service-groups/Default/query-files-linq";
const DELETE: &str = "/nifile/v1/service-groups/Default/delete-files";

/// Upper bound on files removed by one sweep.
const SWEEP_LIMIT: u32 = 1000;

/// Files are torn down by a tag-scoped sweep.
#[derive(Debug, Clone, Copy)]
pub struct FileAdapter;

impl FileAdapter {
    fn tag_clause() -> String {
        format!("properties.{CLEANUP_PROPERTY}")
    }

    /// Extracts the file id from the upload response's `uri`.
    fn id_from_upload(response: &Value) -> CreateOutcome {
        let id = response
            .get("uri")
            .and_then(Value::as_str)
            .and_then(|uri| uri.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty());

        match id {
            Some(id) => CreateOutcome::Created(id.to_string()),
            None => support::single_created(response, "id"),
        }
    }
}

#[async_trait]
impl ResourceAdapter for FileAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::File
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .equals(&Self::tag_clause(), ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "availableFiles").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let mut custom = support::string_properties(properties.get("properties"));
        custom.insert(String::from("Name"), Value::from(name));
        custom.insert(CLEANUP_PROPERTY.to_string(), Value::from(ctx.cleanup_tag()));

        let body = Payload::from_properties(properties, &["properties"])
            .set("name", name)
            .or_default("content", "")
            .set("properties", custom)
            .workspace(ctx)
            .into_value();

        match ctx.send(ApiRequest::post(UPLOAD, body)).await {
            Ok(response) => Ok(Self::id_from_upload(&response)),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, _name: &str) -> Result<DeleteOutcome> {
        let filter = Filter::new()
            .equals(&Self::tag_clause(), ctx.cleanup_tag())
            .workspace(ctx.workspace());
        let ids = ctx
            .query_ids(QUERY, &filter, "availableFiles", SWEEP_LIMIT)
            .await?;

        if ids.is_empty() {
            return Ok(DeleteOutcome::NotFound);
        }

        let response = ctx
            .send(ApiRequest::post(DELETE, json!({ "ids": ids })))
            .await?;
        support::check_batch_deleted(&response, "failed")?;

        Ok(DeleteOutcome::BulkDeleted(ids))
    }

    fn bulk_delete(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, RecordingExecutor};

    const TAG: &str = "seedbed-example:demo";

    #[test]
    fn test_id_from_upload_uri() {
        assert_eq!(
            FileAdapter::id_from_upload(&json!({ "uri": "/nifile/v1/service-groups/Default/files/f-42" })),
            CreateOutcome::Created(String::from("f-42"))
        );
        assert_eq!(
            FileAdapter::id_from_upload(&json!({ "id": "f-7" })),
            CreateOutcome::Created(String::from("f-7"))
        );
        assert!(matches!(FileAdapter::id_from_upload(&Value::Null), CreateOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_upload_body() {
        let fake = RecordingExecutor::new();
        fake.reply("POST", UPLOAD, Reply::Json(json!({ "uri": "/files/f-1" })));
        let ctx = AdapterContext::new(&fake, None, TAG);

        let props = json!({ "content": "a,b\n1,2\n", "properties": { "kind": "csv" } });
        let outcome = FileAdapter
            .create(&ctx, "readings.csv", props.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(outcome, CreateOutcome::Created(String::from("f-1")));
        assert_eq!(
            fake.requests()[0].body,
            Some(json!({
                "name": "readings.csv",
                "content": "a,b\n1,2\n",
                "properties": { "kind": "csv", "Name": "readings.csv", "seedbedCleanupTag": TAG }
            }))
        );
    }

    #[tokio::test]
    async fn test_sweep_ignores_name() {
        let fake = RecordingExecutor::new();
        fake.reply(
            "POST",
            QUERY,
            Reply::Json(json!({ "availableFiles": [{ "id": "f-1" }] })),
        );
        let ctx = AdapterContext::new(&fake, None, TAG);

        let outcome = FileAdapter.delete(&ctx, "readings.csv").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::BulkDeleted(vec![String::from("f-1")]));
        assert_eq!(
            fake.requests()[0].body.clone().unwrap()["filter"],
            format!(r#"properties.seedbedCleanupTag == "{TAG}""#)
        );
    }
}
