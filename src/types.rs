//! Core types for tasks and tags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Ids of the associated tags, sorted by tag name.
    pub tags: Vec<Uuid>,
    /// Full tag records, only populated when the caller asks to expand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_expanded: Option<Vec<Tag>>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A tag. Names are unique across all tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// A request-supplied reference to a tag, resolved before a task write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagRef {
    /// Must name an existing tag.
    Id(Uuid),
    /// Looked up by exact name, created when missing.
    Name(String),
}

impl TagRef {
    /// Classify a raw string: identifier-shaped input becomes `Id`,
    /// anything else is a trimmed `Name`.
    ///
    /// Blank input and the nil UUID are rejected with a reason.
    pub fn from_raw(raw: &str) -> Result<Self, &'static str> {
        let trimmed = raw.trim();
        if let Ok(id) = Uuid::parse_str(trimmed) {
            if id.is_nil() {
                return Err("the nil UUID is not a valid tag id");
            }
            return Ok(TagRef::Id(id));
        }
        if trimmed.is_empty() {
            return Err("tag names must not be blank");
        }
        Ok(TagRef::Name(trimmed.to_string()))
    }
}

/// True when `name` would be read back as a tag id, so it can never be
/// referenced as a name.
pub fn is_uuid_shaped(name: &str) -> bool {
    Uuid::parse_str(name.trim()).is_ok()
}

/// Everything needed to write a task row plus its tag links.
///
/// Used for creation (`id` optionally forced by the caller) and for full
/// replacement, where `id` is ignored in favour of the target id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub tags: Vec<TagRef>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagRef>) -> Self {
        self.tags = tags;
        self
    }

    /// Draft reproducing an existing task, tags referenced by id.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            tags: task.tags.iter().copied().map(TagRef::Id).collect(),
        }
    }
}

/// Input for tag creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub id: Option<Uuid>,
    pub name: String,
}

impl NewTag {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Pagination request for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

/// A page of tasks with its position in the full listing.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
}

/// Parse a UUID leniently.
///
/// Accepts surrounding whitespace, braces, a `urn:uuid:` prefix, the simple
/// 32-digit form and any letter case. The nil UUID is treated as absent.
pub fn parse_uuid_loose(raw: &str) -> Option<Uuid> {
    let id = Uuid::parse_str(raw.trim()).ok()?;
    if id.is_nil() { None } else { Some(id) }
}
