//! Request payload parsing.
//!
//! Turns JSON bodies into typed drafts and patches. Type errors are
//! reported per field; semantic checks (such as a blank title) are left to
//! the service layer.

use crate::error::{ApiError, ApiResult};
use crate::service::patch::{TagsPatch, TaskPatch};
use crate::types::{NewTag, TagRef, TaskDraft, is_uuid_shaped, parse_uuid_loose};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

/// JSON object body of a request.
pub type Body = Map<String, Value>;

/// Parse a raw request body into a JSON object.
pub fn parse_body(raw: &[u8]) -> ApiResult<Body> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    }

    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| ApiError::bad_request(format!("Malformed JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// Helper to get a required string field.
fn required_string(body: &Body, key: &str) -> ApiResult<String> {
    match body.get(key) {
        None => Err(ApiError::missing_field(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ApiError::invalid_value(key, format!("{} must be a string", key))),
    }
}

/// Helper to get an optional string field; `null` counts as absent.
fn optional_string(body: &Body, key: &str) -> ApiResult<Option<String>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ApiError::invalid_value(key, format!("{} must be a string", key))),
    }
}

/// The completion flag, under its current name or the legacy `isCompleted`.
fn completed_field(body: &Body) -> Option<(&'static str, &Value)> {
    if let Some(value) = body.get("completed") {
        return Some(("completed", value));
    }
    body.get("isCompleted").map(|value| ("isCompleted", value))
}

/// Helper to get an optional UUID field.
fn optional_id(body: &Body, key: &str) -> ApiResult<Option<Uuid>> {
    match optional_string(body, key)? {
        None => Ok(None),
        Some(raw) => parse_uuid_loose(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::invalid_value(key, format!("{} must be a UUID", key))),
    }
}

/// Parse one element of a `tags` array.
///
/// Strings are ids when UUID-shaped and names otherwise; objects carry
/// either `id` or `name`.
fn parse_tag_ref(index: usize, value: &Value) -> ApiResult<TagRef> {
    let field = format!("tags[{}]", index);
    match value {
        Value::String(raw) => {
            TagRef::from_raw(raw).map_err(|reason| ApiError::invalid_value(&field, reason))
        }
        Value::Object(obj) => {
            if let Some(id) = obj.get("id") {
                return id
                    .as_str()
                    .and_then(parse_uuid_loose)
                    .map(TagRef::Id)
                    .ok_or_else(|| ApiError::invalid_value(&field, "tag id must be a UUID"));
            }
            match obj.get("name") {
                Some(Value::String(name)) if is_uuid_shaped(name) => Err(
                    ApiError::invalid_value(&field, "tag names must not look like a UUID"),
                ),
                Some(Value::String(name)) if !name.trim().is_empty() => {
                    Ok(TagRef::Name(name.trim().to_string()))
                }
                Some(_) => Err(ApiError::invalid_value(&field, "tag name must be a non-blank string")),
                None => Err(ApiError::invalid_value(&field, "tag object needs an id or a name")),
            }
        }
        _ => Err(ApiError::invalid_value(
            &field,
            "tags must be UUID strings, names or {id}/{name} objects",
        )),
    }
}

fn parse_tag_array(items: &[Value]) -> ApiResult<Vec<TagRef>> {
    items
        .iter()
        .enumerate()
        .map(|(index, value)| parse_tag_ref(index, value))
        .collect()
}

/// Body of `POST /task/create` and `PUT /task`.
///
/// `title` is required; `description` defaults to empty, `completed` to
/// false and `tags` to none. A `tags` value that is neither an array nor
/// null is ignored.
pub fn task_draft(body: &Body) -> ApiResult<TaskDraft> {
    let title = required_string(body, "title")?;
    let description = optional_string(body, "description")?.unwrap_or_default();

    let completed = match completed_field(body) {
        None | Some((_, Value::Null)) => false,
        Some((_, Value::Bool(b))) => *b,
        Some((key, _)) => {
            return Err(ApiError::invalid_value(key, format!("{} must be a boolean", key)));
        }
    };

    let tags = match body.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => parse_tag_array(items)?,
        Some(other) => {
            debug!(value = %other, "Ignoring malformed tags field");
            Vec::new()
        }
    };

    Ok(TaskDraft {
        id: optional_id(body, "id")?,
        title,
        description,
        completed,
        tags,
    })
}

/// Body of `PATCH /task`.
///
/// Absent fields stay untouched. `tags: null` clears the tag set and
/// `description: null` resets the description; a `tags` value that is
/// neither an array nor null is ignored.
pub fn task_patch(body: &Body) -> ApiResult<TaskPatch> {
    let title = match body.get("title") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ApiError::invalid_value("title", "title must be a string")),
    };

    let description = match body.get("description") {
        None => None,
        Some(Value::Null) => Some(String::new()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ApiError::invalid_value(
                "description",
                "description must be a string or null",
            ));
        }
    };

    let completed = match completed_field(body) {
        None => None,
        Some((_, Value::Bool(b))) => Some(*b),
        Some((key, _)) => {
            return Err(ApiError::invalid_value(key, format!("{} must be a boolean", key)));
        }
    };

    let tags = match body.get("tags") {
        None => TagsPatch::Keep,
        Some(Value::Null) => TagsPatch::Clear,
        Some(Value::Array(items)) => TagsPatch::Replace(parse_tag_array(items)?),
        Some(other) => {
            debug!(value = %other, "Ignoring malformed tags field in patch");
            TagsPatch::Keep
        }
    };

    Ok(TaskPatch {
        title,
        description,
        completed,
        tags,
    })
}

/// Body of `POST /tag/create`.
///
/// Names shaped like a UUID are refused: task writes would read them back
/// as tag ids.
pub fn new_tag(body: &Body) -> ApiResult<NewTag> {
    let name = required_string(body, "name")?;
    if is_uuid_shaped(&name) {
        return Err(ApiError::invalid_value("name", "tag names must not look like a UUID"));
    }

    Ok(NewTag {
        id: optional_id(body, "id")?,
        name,
    })
}
