//! Partial task updates.

use crate::types::{TagRef, Task, TaskDraft};

/// What a patch does to the tag set of a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagsPatch {
    /// Field absent (or malformed): links stay as they are.
    #[default]
    Keep,
    /// `tags: null`: drop every link.
    Clear,
    /// Replace the whole set with these references.
    Replace(Vec<TagRef>),
}

/// A parsed `PATCH` body. `None` means "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub tags: TagsPatch,
}

impl TaskPatch {
    /// True when applying the patch cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.tags == TagsPatch::Keep
    }

    /// Merge the patch over the current state of a task.
    ///
    /// The result is a full draft so the write goes through the same path
    /// as a replacement. Kept tags are referenced by id.
    pub fn apply(self, current: &Task) -> TaskDraft {
        let mut draft = TaskDraft::from_task(current);

        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(completed) = self.completed {
            draft.completed = completed;
        }
        match self.tags {
            TagsPatch::Keep => {}
            TagsPatch::Clear => draft.tags.clear(),
            TagsPatch::Replace(tags) => draft.tags = tags,
        }

        draft
    }
}
