//! Tag storage.

use super::{Database, uuid_column};
use crate::error::ApiError;
use crate::types::{NewTag, Tag, is_uuid_shaped};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

fn parse_tag_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
    })
}

pub(crate) fn tag_exists(conn: &Connection, tag_id: Uuid) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tags WHERE id = ?1",
        params![tag_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn find_tag_id_by_name(conn: &Connection, name: &str) -> Result<Option<Uuid>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM tags WHERE name = ?1")?;

    match stmt.query_row(params![name], |row| uuid_column(row, 0)) {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert a tag row. Returns `false` when the id is already taken.
pub(crate) fn insert_tag(conn: &Connection, tag_id: Uuid, name: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO tags (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        params![tag_id.to_string(), name],
    )?;
    Ok(inserted > 0)
}

/// Ids of the tags linked to a task, ordered by tag name.
pub(crate) fn tag_ids_for_task(conn: &Connection, task_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare_cached(
        "SELECT tt.tag_id FROM task_tags tt
         JOIN tags t ON t.id = tt.tag_id
         WHERE tt.task_id = ?1
         ORDER BY t.name",
    )?;

    let ids = stmt
        .query_map(params![task_id.to_string()], |row| uuid_column(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(ids)
}

fn tags_for_task(conn: &Connection, task_id: Uuid) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name FROM tags t
         JOIN task_tags tt ON tt.tag_id = t.id
         WHERE tt.task_id = ?1
         ORDER BY t.name",
    )?;

    let tags = stmt
        .query_map(params![task_id.to_string()], parse_tag_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tags)
}

impl Database {
    /// All tags, ordered by name.
    pub fn get_all_tags(&self) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name ASC")?;
            let tags = stmt
                .query_map([], parse_tag_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            debug!(count = tags.len(), "Fetched tags");
            Ok(tags)
        })
    }

    /// Create a tag, or return the existing one with the same name.
    ///
    /// The flag is `true` when a new row was written. A forced id is ignored
    /// if the name already exists.
    pub fn add_tag(&self, new_tag: &NewTag) -> Result<(Tag, bool)> {
        let name = new_tag.name.trim();
        if name.is_empty() {
            return Err(ApiError::invalid_value("name", "name must not be blank").into());
        }
        if is_uuid_shaped(name) {
            return Err(ApiError::invalid_value("name", "tag names must not look like a UUID").into());
        }

        self.with_conn(|conn| {
            if let Some(existing) = find_tag_id_by_name(conn, name)? {
                info!(tag_id = %existing, name, "Tag exists");
                let tag = Tag {
                    id: existing,
                    name: name.to_string(),
                };
                return Ok((tag, false));
            }

            let tag_id = new_tag.id.unwrap_or_else(Uuid::new_v4);
            if !insert_tag(conn, tag_id, name)? {
                return Err(ApiError::invalid_value(
                    "id",
                    format!("tag id {} is already in use", tag_id),
                )
                .into());
            }

            info!(tag_id = %tag_id, name, "Tag inserted");
            let tag = Tag {
                id: tag_id,
                name: name.to_string(),
            };
            Ok((tag, true))
        })
    }

    /// Full tag records linked to a task, ordered by name.
    pub fn get_task_tags(&self, task_id: Uuid) -> Result<Vec<Tag>> {
        self.with_conn(|conn| tags_for_task(conn, task_id))
    }

    pub fn count_tags(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
