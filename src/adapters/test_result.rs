//! Test result adapter.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const RESULTS: &str = "/nitestmonitor/v2/results";
const QUERY: &str = "/nitestmonitor/v2/query-results";
const DELETE: &str = "/nitestmonitor/v2/delete-results";

/// Upper bound on results removed by one sweep.
const SWEEP_LIMIT: u32 = 1000;

/// Results are named by program name, carry the cleanup tag as a keyword,
/// and are torn down by a tag-scoped sweep.
#[derive(Debug, Clone, Copy)]
pub struct TestResultAdapter;

impl TestResultAdapter {
    fn tagged(ctx: &AdapterContext<'_>) -> Filter {
        Filter::new()
            .contains("keywords", ctx.cleanup_tag())
            .workspace(ctx.workspace())
    }

    /// Accepts `status: PASSED` as shorthand for `{ statusType: PASSED }`.
    fn status(properties: &Map<String, Value>) -> Value {
        match properties.get("status") {
            Some(Value::String(s)) => json!({ "statusType": s.to_uppercase(), "statusName": s }),
            Some(other @ Value::Object(_)) => other.clone(),
            _ => json!({ "statusType": "PASSED", "statusName": "Passed" }),
        }
    }
}

#[async_trait]
impl ResourceAdapter for TestResultAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::TestResult
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("programName", name)
            .contains("keywords", ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "results").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let result = Payload::from_properties(properties, &["keywords", "properties", "status"])
            .set("programName", name)
            .set("status", Self::status(properties))
            .set(
                "keywords",
                support::keywords_with(properties.get("keywords"), ctx.cleanup_tag()),
            )
            .set("properties", support::string_properties(properties.get("properties")))
            .workspace(ctx)
            .into_value();

        let request = ApiRequest::post(RESULTS, json!({ "results": [result] }));
        match ctx.send(request).await {
            Ok(response) => Ok(support::batch_created(&response, "results", "failed")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, _name: &str) -> Result<DeleteOutcome> {
        let ids = ctx
            .query_ids(QUERY, &Self::tagged(ctx), "results", SWEEP_LIMIT)
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
