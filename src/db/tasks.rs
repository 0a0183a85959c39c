//! Task CRUD.

use super::reconcile::{replace_task_tags, resolve_tag_refs};
use super::tags::tag_ids_for_task;
use super::{Database, now_ms, uuid_column};
use crate::error::ApiError;
use crate::types::{Task, TaskDraft};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

/// Parse a row selected with [`TASK_COLUMNS`]. Tags are filled in separately.
pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: uuid_column(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get(3)?,
        tags: Vec::new(),
        tags_expanded: None,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: Uuid) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS))?;

    let result = stmt.query_row(params![task_id.to_string()], parse_task_row);

    match result {
        Ok(mut task) => {
            task.tags = tag_ids_for_task(conn, task.id)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read back a row written earlier in the same transaction.
fn stored_task(conn: &Connection, task_id: Uuid) -> Result<Task> {
    get_task_internal(conn, task_id)?
        .ok_or_else(|| anyhow::anyhow!("task {} missing after write", task_id))
}

fn task_exists(conn: &Connection, task_id: Uuid) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE id = ?1",
        params![task_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn attach_tags(conn: &Connection, tasks: &mut [Task]) -> Result<()> {
    for task in tasks.iter_mut() {
        task.tags = tag_ids_for_task(conn, task.id)?;
    }
    Ok(())
}

impl Database {
    /// All tasks in creation order, each with its tag ids.
    pub fn get_all_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks ORDER BY rowid ASC",
                TASK_COLUMNS
            ))?;
            let mut tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            attach_tags(conn, &mut tasks)?;

            debug!(count = tasks.len(), "Fetched tasks");
            Ok(tasks)
        })
    }

    /// A window of tasks in creation order, with the total task count read
    /// under the same lock.
    pub fn list_tasks(&self, limit: i64, offset: i64) -> Result<(Vec<Task>, i64)> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks ORDER BY rowid ASC LIMIT ?1 OFFSET ?2",
                TASK_COLUMNS
            ))?;
            let mut tasks = stmt
                .query_map(params![limit, offset], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            attach_tags(conn, &mut tasks)?;

            let total: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;

            debug!(count = tasks.len(), total, limit, offset, "Fetched task page");
            Ok((tasks, total))
        })
    }

    pub fn count_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?;
            if task.is_none() {
                debug!(task_id = %task_id, "Task not found");
            }
            Ok(task)
        })
    }

    /// Insert a task and link its tags in one transaction.
    ///
    /// Uses the draft's id when given, otherwise generates a UUID v4.
    /// Returns the stored task as read back inside the transaction.
    pub fn add_task(&self, draft: &TaskDraft) -> Result<Task> {
        let task_id = draft.id.unwrap_or_else(Uuid::new_v4);
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if task_exists(&tx, task_id)? {
                return Err(ApiError::invalid_value(
                    "id",
                    format!("task id {} is already in use", task_id),
                )
                .into());
            }

            tx.execute(
                "INSERT INTO tasks (id, title, description, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    task_id.to_string(),
                    &draft.title,
                    &draft.description,
                    draft.completed,
                    now,
                    now,
                ],
            )?;

            let tag_ids = resolve_tag_refs(&tx, &draft.tags)?;
            replace_task_tags(&tx, task_id, &tag_ids)?;
            let task = stored_task(&tx, task_id)?;

            tx.commit()?;

            info!(task_id = %task_id, title = %draft.title, tags = tag_ids.len(), "Task inserted");
            Ok(task)
        })
    }

    /// Rewrite a task row and replace its whole tag set.
    ///
    /// Returns `None` when no task has this id, otherwise the updated task.
    /// Nothing is written unless every tag reference resolves.
    pub fn update_task(&self, task_id: Uuid, draft: &TaskDraft) -> Result<Option<Task>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE tasks SET title = ?1, description = ?2, completed = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    &draft.title,
                    &draft.description,
                    draft.completed,
                    now,
                    task_id.to_string(),
                ],
            )?;

            if updated == 0 {
                debug!(task_id = %task_id, "No rows updated");
                return Ok(None);
            }

            let tag_ids = resolve_tag_refs(&tx, &draft.tags)?;
            replace_task_tags(&tx, task_id, &tag_ids)?;
            let task = stored_task(&tx, task_id)?;

            tx.commit()?;

            info!(task_id = %task_id, tags = tag_ids.len(), "Task updated");
            Ok(Some(task))
        })
    }

    /// Delete a task; its tag links cascade. Returns `false` if nothing matched.
    pub fn delete_task(&self, task_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM tasks WHERE id = ?1",
                params![task_id.to_string()],
            )?;

            let found = deleted > 0;
            info!(task_id = %task_id, found, "Delete task");
            Ok(found)
        })
    }

    /// Remove every task, tag and link atomically.
    pub fn delete_all(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let links = tx.execute("DELETE FROM task_tags", [])?;
            let tasks = tx.execute("DELETE FROM tasks", [])?;
            let tags = tx.execute("DELETE FROM tags", [])?;

            tx.commit()?;

            info!(tasks, tags, links, "All tasks and tags cleared");
            Ok(())
        })
    }
}
