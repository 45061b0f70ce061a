//! Data table adapter.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::api::ApiRequest;
use crate::config::ResourceType;
use crate::error::Result;

use super::support::{self, Filter, Payload, CLEANUP_PROPERTY};
use super::{AdapterContext, CreateOutcome, DeleteOutcome, ResourceAdapter};

const TABLES: &str = "/nidataframe/v1/tables";
const QUERY: &str = "/nidataframe/v1/query-tables";

const DEFAULT_COLUMN_TYPE: &str = "NULLABLE";
const DEFAULT_DATA_TYPE: &str = "STRING";

/// Data tables carry the cleanup tag as an embedded property.
#[derive(Debug, Clone, Copy)]
pub struct DataTableAdapter;

impl DataTableAdapter {
    /// Normalizes one column declaration.
    ///
    /// A bare string is a nullable string column of that name.
    fn column(declared: &Value) -> Value {
        match declared {
            Value::String(name) => json!({
                "name": name,
                "dataType": DEFAULT_DATA_TYPE,
                "columnType": DEFAULT_COLUMN_TYPE,
            }),
            Value::Object(fields) => {
                let column = Payload::from_properties(fields, &["properties"])
                    .or_default("dataType", DEFAULT_DATA_TYPE)
                    .or_default("columnType", DEFAULT_COLUMN_TYPE);
                match fields.get("properties") {
                    Some(props) => column
                        .set("properties", support::string_properties(Some(props)))
                        .into_value(),
                    None => column.into_value(),
                }
            }
            other => other.clone(),
        }
    }
}

#[async_trait]
impl ResourceAdapter for DataTableAdapter {
    fn kind(&self) -> ResourceType {
        ResourceType::DataTable
    }

    async fn find_by_name(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<Option<String>> {
        let filter = Filter::new()
            .equals("name", name)
            .equals(&format!("properties[\"{CLEANUP_PROPERTY}\"]"), ctx.cleanup_tag())
            .workspace(ctx.workspace());

        ctx.query_first_id(QUERY, &filter, "tables").await
    }

    async fn create(
        &self,
        ctx: &AdapterContext<'_>,
        name: &str,
        properties: &Map<String, Value>,
    ) -> Result<CreateOutcome> {
        let columns: Vec<Value> = properties
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| cols.iter().map(Self::column).collect())
            .unwrap_or_default();

        let mut custom = support::string_properties(properties.get("properties"));
        custom.insert(CLEANUP_PROPERTY.to_string(), Value::from(ctx.cleanup_tag()));

        let body = Payload::from_properties(properties, &["properties", "columns"])
            .set("name", name)
            .set("columns", columns)
            .set("properties", custom)
            .workspace(ctx)
            .into_value();

        match ctx.send(ApiRequest::post(TABLES, body)).await {
            Ok(response) => Ok(support::single_created(&response, "id")),
            Err(e) => support::duplicate_or(e),
        }
    }

    async fn delete(&self, ctx: &AdapterContext<'_>, name: &str) -> Result<DeleteOutcome> {
        let Some(id) = self.find_by_name(ctx, name).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        let response = ctx.send(ApiRequest::delete(format!("{TABLES}/{id}"))).await;
        Ok(support::missing_as_none(response)?
            .map_or(DeleteOutcome::NotFound, |_| DeleteOutcome::Deleted(id)))
    }
}
