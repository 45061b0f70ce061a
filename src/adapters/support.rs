//! Building blocks shared by the adapters: query filters, payload shaping,
//! and interpretation of create and delete responses.

use serde_json::{Map, Value};

use crate::error::{ApiError, Result, SeedbedError};

use super::{AdapterContext, CreateOutcome};

/// Property key carrying the cleanup tag on kinds without keywords.
pub const CLEANUP_PROPERTY: &str = "seedbedCleanupTag";

/// Phrases services use to report that a resource already exists.
const DUPLICATE_MARKERS: &[&str] = &["already exists", "duplicate"];

/// A query filter in the service's expression language.
///
/// Clauses are joined with `&&`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<String>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field == "value"`.
    #[must_use]
    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{field} == {}", quote(value)));
        self
    }

    /// Adds `field.Contains("value")`.
    #[must_use]
    pub fn contains(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{field}.Contains({})", quote(value)));
        self
    }

    /// Adds a workspace clause when a workspace is configured.
    #[must_use]
    pub fn workspace(self, workspace: Option<&str>) -> Self {
        match workspace {
            Some(ws) => self.equals("workspace", ws),
            None => self,
        }
    }

    /// Renders the filter expression.
    #[must_use]
    pub fn build(&self) -> String {
        self.clauses.join(" && ")
    }
}

/// Quotes a string literal for a filter expression.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Returns the identifiers of every entry of `response[collection]`.
pub(super) fn ids_in(response: &Value, collection: &str) -> Vec<String> {
    response
        .get(collection)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(id_of).collect())
        .unwrap_or_default()
}

/// Returns the `id` of a response entry.
pub(super) fn id_of(entry: &Value) -> Option<String> {
    match entry.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts `snake_case` to `camelCase`.
pub(super) fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;

    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Renders a scalar as the string the service stores for custom properties.
fn property_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Coerces a custom-property mapping to string values.
pub(super) fn string_properties(value: Option<&Value>) -> Map<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(property_string(v))))
                .collect()
        })
        .unwrap_or_default()
}

/// Returns declared keywords plus the cleanup tag.
pub(super) fn keywords_with(value: Option<&Value>, tag: &str) -> Vec<Value> {
    let mut keywords: Vec<String> = value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(property_string).collect())
        .unwrap_or_default();

    if !keywords.iter().any(|k| k == tag) {
        keywords.push(tag.to_string());
    }

    keywords.into_iter().map(Value::String).collect()
}

/// Returns declared tags plus the cleanup tag as one comma-joined string.
pub(super) fn joined_tags_with(value: Option<&Value>, tag: &str) -> String {
    let mut tags: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().map(property_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };

    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }

    tags.join(",")
}

/// A request body under construction.
///
/// Starts from the document properties with keys renamed to `camelCase`;
/// keys the adapter handles itself are left out.
#[derive(Debug, Clone, Default)]
pub(super) struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    pub(super) fn from_properties(properties: &Map<String, Value>, reserved: &[&str]) -> Self {
        let fields = properties
            .iter()
            .filter(|(k, _)| !reserved.contains(&k.as_str()))
            .map(|(k, v)| (camel_case(k), v.clone()))
            .collect();
        Self { fields }
    }

    /// Sets a field, replacing any declared value.
    pub(super) fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Sets a field only when it was not declared.
    pub(super) fn or_default(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields
            .entry(key.to_string())
            .or_insert_with(|| value.into());
        self
    }

    /// Sets `workspace` from the context unless declared.
    pub(super) fn workspace(self, ctx: &AdapterContext<'_>) -> Self {
        match ctx.workspace() {
            Some(ws) => self.or_default("workspace", ws),
            None => self,
        }
    }

    pub(super) fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Returns true if a message reports a duplicate.
fn is_duplicate_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    DUPLICATE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Collects every error message in a response or error body.
fn messages_in(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(m)) = map.get("message") {
                out.push(m.clone());
            }
            for (key, child) in map {
                if key != "message" {
                    messages_in(child, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| messages_in(v, out)),
        _ => {}
    }
}

/// Finds the identifier of an existing resource named by a duplicate error.
fn duplicate_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => ["resourceId", "existingId"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| map.values().find_map(duplicate_id)),
        Value::Array(items) => items.iter().find_map(duplicate_id),
        _ => None,
    }
}

/// Classifies an error body that reports a duplicate.
fn duplicate_outcome(body: &Value) -> CreateOutcome {
    duplicate_id(body).map_or(CreateOutcome::DuplicateUnresolved, CreateOutcome::DuplicateFound)
}

/// Interprets a batch create response such as
/// `{ "<created>": [{ "id": .. }], "<failed>": [..], "error": {..} }`.
pub(super) fn batch_created(response: &Value, created: &str, failed: &str) -> CreateOutcome {
    if let Some(id) = ids_in(response, created).into_iter().next() {
        return CreateOutcome::Created(id);
    }

    let mut messages = Vec::new();
    if let Some(entries) = response.get(failed) {
        messages_in(entries, &mut messages);
    }
    if let Some(error) = response.get("error") {
        messages_in(error, &mut messages);
    }

    if messages.iter().any(|m| is_duplicate_message(m)) {
        return duplicate_outcome(response);
    }

    if messages.is_empty() {
        CreateOutcome::Failed(String::from("Service returned no identifier"))
    } else {
        CreateOutcome::Failed(messages.join("; "))
    }
}

/// Interprets a single-object create response `{ "<key>": "<id>" }`.
pub(super) fn single_created(response: &Value, key: &str) -> CreateOutcome {
    match response.get(key) {
        Some(Value::String(id)) if !id.is_empty() => CreateOutcome::Created(id.clone()),
        Some(Value::Number(n)) => CreateOutcome::Created(n.to_string()),
        _ => CreateOutcome::Failed(format!("Service response carried no '{key}'")),
    }
}

/// Maps a create call error to a duplicate outcome when the service said so.
///
/// Any other error is passed through.
pub(super) fn duplicate_or(err: SeedbedError) -> Result<CreateOutcome> {
    let SeedbedError::Api(api) = &err else {
        return Err(err);
    };

    let reports_duplicate = match api {
        ApiError::Request { message, .. } => api.is_conflict() || is_duplicate_message(message),
        _ => false,
    };

    if reports_duplicate {
        Ok(api.body().map_or(CreateOutcome::DuplicateUnresolved, duplicate_outcome))
    } else {
        Err(err)
    }
}

/// Treats a 404 from a delete call as "nothing to delete".
pub(super) fn missing_as_none(result: Result<Value>) -> Result<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SeedbedError::Api(api)) if api.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fails when a batch delete response lists failures.
pub(super) fn check_batch_deleted(response: &Value, failed: &str) -> Result<()> {
    let failures = response
        .get(failed)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty());

    let Some(failures) = failures else {
        return Ok(());
    };

    let mut messages = Vec::new();
    messages_in(&Value::Array(failures.clone()), &mut messages);
    if messages.is_empty() {
        messages = failures.iter().map(property_string).collect();
    }

    Err(ApiError::invalid_response(format!(
        "Service refused to delete: {}",
        messages.join("; ")
    ))
    .into())
}
