//! Task and tag operations behind the HTTP routes.
//!
//! The service validates drafts, merges patches, applies pagination and
//! maps storage outcomes (`None`, `false`) onto [`ApiError`] kinds.

pub mod patch;

use crate::config::ApiConfig;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{NewTag, PageRequest, Tag, Task, TaskDraft, TaskPage};
use patch::TaskPatch;
use tracing::{debug, info};
use uuid::Uuid;

/// Reject titles that are empty after trimming.
fn validate_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::invalid_value("title", "title must not be empty"));
    }
    Ok(())
}

/// Page window after clamping a request against the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
}

impl PageWindow {
    /// `page <= 0` becomes 1, `per_page <= 0` the default, and `per_page`
    /// never exceeds the maximum.
    pub fn clamp(request: PageRequest, api: &ApiConfig) -> Self {
        let page = request.page.max(1);
        let per_page = if request.per_page <= 0 {
            api.default_page_size
        } else {
            request.per_page
        };
        Self {
            page,
            per_page: per_page.clamp(1, api.max_page_size.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

/// Shared entry point for every task and tag operation.
#[derive(Clone)]
pub struct TaskService {
    db: Database,
    api: ApiConfig,
}

impl TaskService {
    pub fn new(db: Database, api: ApiConfig) -> Self {
        Self { db, api }
    }

    fn expand(&self, task: &mut Task) -> ApiResult<()> {
        task.tags_expanded = Some(self.db.get_task_tags(task.id)?);
        Ok(())
    }

    /// List tasks, optionally one page at a time.
    pub fn list_tasks(&self, page: Option<PageRequest>, expand: bool) -> ApiResult<TaskPage> {
        let mut result = match page {
            None => {
                let tasks = self.db.get_all_tasks()?;
                TaskPage {
                    total: tasks.len() as i64,
                    tasks,
                    page: None,
                    per_page: None,
                    total_pages: None,
                }
            }
            Some(request) => {
                let window = PageWindow::clamp(request, &self.api);
                debug!(page = window.page, per_page = window.per_page, "Listing task page");
                let (tasks, total) = self.db.list_tasks(window.per_page, window.offset())?;
                TaskPage {
                    tasks,
                    total,
                    page: Some(window.page),
                    per_page: Some(window.per_page),
                    total_pages: Some(window.total_pages(total)),
                }
            }
        };

        if expand {
            for task in result.tasks.iter_mut() {
                self.expand(task)?;
            }
        }

        Ok(result)
    }

    pub fn get_task(&self, task_id: Uuid, expand: bool) -> ApiResult<Task> {
        let mut task = self
            .db
            .get_task(task_id)?
            .ok_or_else(|| ApiError::task_not_found(task_id))?;

        if expand {
            self.expand(&mut task)?;
        }
        Ok(task)
    }

    pub fn create_task(&self, draft: TaskDraft) -> ApiResult<Task> {
        validate_title(&draft.title)?;

        let task = self.db.add_task(&draft)?;
        info!(task_id = %task.id, "Created task");
        Ok(task)
    }

    /// Overwrite every field and the tag set of an existing task.
    pub fn replace_task(&self, task_id: Uuid, draft: TaskDraft) -> ApiResult<Task> {
        validate_title(&draft.title)?;

        let task = self
            .db
            .update_task(task_id, &draft)?
            .ok_or_else(|| ApiError::task_not_found(task_id))?;
        info!(task_id = %task_id, "Replaced task");
        Ok(task)
    }

    /// Apply a partial update as a single write.
    ///
    /// An empty patch returns the current task without writing.
    pub fn patch_task(&self, task_id: Uuid, patch: TaskPatch) -> ApiResult<Task> {
        let current = self.get_task(task_id, false)?;
        if patch.is_empty() {
            debug!(task_id = %task_id, "Empty patch");
            return Ok(current);
        }

        let draft = patch.apply(&current);
        validate_title(&draft.title)?;

        let task = self
            .db
            .update_task(task_id, &draft)?
            .ok_or_else(|| ApiError::task_not_found(task_id))?;
        info!(task_id = %task_id, "Patched task");
        Ok(task)
    }

    pub fn delete_task(&self, task_id: Uuid) -> ApiResult<()> {
        if !self.db.delete_task(task_id)? {
            return Err(ApiError::task_not_found(task_id));
        }
        Ok(())
    }

    /// Wipe all tasks, tags and links.
    pub fn delete_all(&self) -> ApiResult<()> {
        self.db.delete_all()?;
        Ok(())
    }

    pub fn list_tags(&self) -> ApiResult<Vec<Tag>> {
        Ok(self.db.get_all_tags()?)
    }

    /// Create a tag or return the one that already has this name.
    pub fn create_tag(&self, new_tag: NewTag) -> ApiResult<(Tag, bool)> {
        Ok(self.db.add_tag(&new_tag)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> ApiConfig {
        ApiConfig {
            default_page_size: 10,
            max_page_size: 100,
        }
    }

    #[test]
    fn page_window_clamps_out_of_range_values() {
        let window = PageWindow::clamp(PageRequest { page: 0, per_page: 0 }, &api());
        assert_eq!(window, PageWindow { page: 1, per_page: 10 });

        let window = PageWindow::clamp(PageRequest { page: -3, per_page: 500 }, &api());
        assert_eq!(window, PageWindow { page: 1, per_page: 100 });
    }

    #[test]
    fn page_window_math() {
        let window = PageWindow::clamp(PageRequest { page: 3, per_page: 4 }, &api());
        assert_eq!(window.offset(), 8);
        assert_eq!(window.total_pages(0), 0);
        assert_eq!(window.total_pages(8), 2);
        assert_eq!(window.total_pages(9), 3);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(validate_title("  \t").is_err());
        assert!(validate_title(" ok ").is_ok());
    }
}
