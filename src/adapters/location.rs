//! Location adapter.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload, CLEANUP_PROPERTY};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const LOCATIONS: &str = "/nilocation/v1/locations";
const QUERY: &str = "/nilocation/v1/query-locations";

/// Locations carry the cleanup tag as an embedded property.
#[derive(Debug, Clone, Copy)]
pub struct LocationAdapter;

impl LocationAdapter {
    fn filter(ctx: &AdapterContext<'_>, name: &str) -> Filter {
        Filter::new()
            .equals("name", name)
            .equals(&format!("properties[\"{CLEANUP_PROPERTY}\"]"), ctx.cleanup_tag())
            .workspace(ctx.workspace())
    }

    fn payload(ctx: &AdapterContext<'_>, name: &str, properties: &Map<String, Value>) -> Value {
        let mut custom = support::string_properties(properties.get("properties"));
        custom.insert(CLEANUP_PROPERTY.to_string(), Value::from(ctx.cleanup_tag()));

        Payload::from_properties(properties, &["properties"])
            .set("name", name)
            .set("properties", custom)
            .workspace(ctx)
            .into_value()
    }
}

#[async_trait]
impl ResourceAdapter for LocationAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::Location
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        ctx.query_first_id(QUERY, &Self::filter(ctx, name), "locations")
            .await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let request = ApiRequest::post(LOCATIONS, Self::payload(ctx, name, properties));

        match ctx.send(request).await {
            Ok(response) => Ok(support::single_created(&response, "id")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx.send(ApiRequest::delete(format!("{LOCATIONS}/{id}"))).await;
        Ok(support::missing_as_none(response)?
            .map_or(DeleteOutcome::NotFound, |_| DeleteOutcome::Deleted(id)))
    }
}
