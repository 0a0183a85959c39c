//! Route handlers.
//!
//! Bodies are taken as raw bytes and parsed by [`crate::payload`] so that
//! malformed input is reported inside the envelope rather than by an axum
//! rejection.

use super::AppState;
use super::envelope::Reply;
use crate::error::{ApiError, ApiResult};
use crate::payload;
use crate::types::{PageRequest, parse_uuid_loose};
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{Method, Uri};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    per_page: Option<String>,
    expand: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    id: Option<String>,
    expand: Option<String>,
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e)))
}

/// Raw body as a JSON object; extraction failures (such as an oversized
/// body) are reported as `bad_request`.
fn json_body(body: Result<Bytes, BytesRejection>) -> ApiResult<payload::Body> {
    let body = body.map_err(|e| {
        ApiError::bad_request(format!("Unreadable request body: {}", e))
            .with_detail("status", e.status().as_u16())
    })?;
    payload::parse_body(&body)
}

/// The `id` query parameter, parsed leniently.
fn required_id(raw: Option<&str>) -> ApiResult<Uuid> {
    match raw.map(str::trim) {
        None | Some("") => Err(ApiError::missing_field("id")),
        Some(raw) => parse_uuid_loose(raw).ok_or_else(|| ApiError::invalid_id("id", raw)),
    }
}

fn flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

fn integer(field: &str, raw: Option<&str>) -> ApiResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            ApiError::bad_request(format!("{} must be an integer, got '{}'", field, raw))
                .with_field(field)
        }),
    }
}

fn page_request(q: &ListQuery) -> ApiResult<Option<PageRequest>> {
    let page = integer("page", q.page.as_deref())?;
    let per_page = integer("per_page", q.per_page.as_deref())?;

    if page.is_none() && per_page.is_none() {
        return Ok(None);
    }
    Ok(Some(PageRequest {
        page: page.unwrap_or(1),
        per_page: per_page.unwrap_or(0),
    }))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Reply> {
    let q = query(q)?;
    let page = page_request(&q)?;

    let result = state
        .service()
        .list_tasks(page, flag(q.expand.as_deref()))?;
    Reply::ok("Tasks retrieved").with_data(result)
}

pub async fn delete_all_tasks(State(state): State<AppState>) -> ApiResult<Reply> {
    state.service().delete_all()?;
    Ok(Reply::ok("All tasks and tags deleted"))
}

pub async fn get_task(
    State(state): State<AppState>,
    q: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Reply> {
    let q = query(q)?;
    let task_id = required_id(q.id.as_deref())?;

    let task = state
        .service()
        .get_task(task_id, flag(q.expand.as_deref()))?;
    Reply::ok("Task retrieved").with_data(task)
}

pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Reply> {
    let body = json_body(body)?;
    let draft = payload::task_draft(&body)?;

    let task = state.service().create_task(draft)?;
    Reply::created("Task created").with_data(task)
}

pub async fn replace_task(
    State(state): State<AppState>,
    q: Result<Query<TaskQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Reply> {
    let task_id = required_id(query(q)?.id.as_deref())?;
    let body = json_body(body)?;
    let draft = payload::task_draft(&body)?;

    let task = state.service().replace_task(task_id, draft)?;
    Reply::ok("Task replaced").with_data(task)
}

pub async fn patch_task(
    State(state): State<AppState>,
    q: Result<Query<TaskQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Reply> {
    let task_id = required_id(query(q)?.id.as_deref())?;
    let body = json_body(body)?;
    let patch = payload::task_patch(&body)?;

    let task = state.service().patch_task(task_id, patch)?;
    Reply::ok("Task updated").with_data(task)
}

pub async fn delete_task(
    State(state): State<AppState>,
    q: Result<Query<TaskQuery>, QueryRejection>,
) -> ApiResult<Reply> {
    let task_id = required_id(query(q)?.id.as_deref())?;

    state.service().delete_task(task_id)?;
    Reply::ok("Task deleted").with_data(json!({ "id": task_id }))
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Reply> {
    let tags = state.service().list_tags()?;
    Reply::ok("Tags retrieved").with_data(tags)
}

pub async fn create_tag(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Reply> {
    let body = json_body(body)?;
    let new_tag = payload::new_tag(&body)?;

    let (tag, created) = state.service().create_tag(new_tag)?;
    let reply = if created {
        Reply::created("Tag created")
    } else {
        Reply::ok("Tag already exists")
    };
    reply.with_data(json!({ "id": tag.id, "name": tag.name, "created": created }))
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn health() -> ApiResult<Reply> {
    Reply::ok("Service healthy").with_data(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fallback for unknown paths and unsupported methods on known paths.
pub async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::route_not_found(method.as_str(), uri.path())
}
