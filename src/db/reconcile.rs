//! Tag reconciliation.
//!
//! Turns the tag references of a task write into the set of persisted tag
//! ids to link, and rewrites the link rows. Every function here runs on the
//! caller's transaction so a failed resolution leaves nothing behind.

use super::tags::{find_tag_id_by_name, insert_tag, tag_exists};
use crate::error::ApiError;
use crate::types::{TagRef, is_uuid_shaped};
use anyhow::Result;
use rusqlite::{Connection, params};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Resolve tag references to existing tag ids.
///
/// Ids must exist; names are looked up exactly and created when missing.
/// The result is deduplicated, keeping first occurrences.
pub fn resolve_tag_refs(conn: &Connection, refs: &[TagRef]) -> Result<Vec<Uuid>> {
    let mut resolved = Vec::with_capacity(refs.len());
    let mut seen = HashSet::with_capacity(refs.len());

    for tag_ref in refs {
        let tag_id = match tag_ref {
            TagRef::Id(id) => {
                if !tag_exists(conn, *id)? {
                    warn!(tag_id = %id, "Tag reference does not exist");
                    return Err(ApiError::tag_not_found(id).into());
                }
                *id
            }
            TagRef::Name(name) => resolve_name(conn, name)?,
        };

        if seen.insert(tag_id) {
            resolved.push(tag_id);
        }
    }

    Ok(resolved)
}

fn resolve_name(conn: &Connection, name: &str) -> Result<Uuid> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_value("tags", "tag names must not be blank").into());
    }
    if is_uuid_shaped(name) {
        return Err(ApiError::invalid_value("tags", "tag names must not look like a UUID").into());
    }

    if let Some(existing) = find_tag_id_by_name(conn, name)? {
        return Ok(existing);
    }

    let tag_id = Uuid::new_v4();
    insert_tag(conn, tag_id, name)?;
    debug!(tag_id = %tag_id, name, "Created tag while resolving references");
    Ok(tag_id)
}

/// Replace all links of a task with `tag_ids` (delete, then reinsert).
pub fn replace_task_tags(conn: &Connection, task_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
    let task_key = task_id.to_string();
    conn.execute("DELETE FROM task_tags WHERE task_id = ?1", params![task_key])?;

    let mut stmt =
        conn.prepare_cached("INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tag_ids {
        stmt.execute(params![task_key, tag_id.to_string()])?;
    }

    debug!(task_id = %task_id, count = tag_ids.len(), "Replaced tag links");
    Ok(())
}
