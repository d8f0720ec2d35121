//! Tag Repository - Vocabulary Operations
//!
//! SQLite-backed tag vocabulary: listing, per-user usage counts and
//! autocomplete. Item-tag associations are in `item_tag`.

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{normalize_tag_name, DomainResult, Tag, TagCount};
use crate::repository::db::{open_conn, SharedConnection};

/// SQLite implementation of the tag store
#[derive(Clone)]
pub struct TagRepository {
    pub(super) conn: SharedConnection,
}

impl TagRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Every tag name, alphabetically
    pub async fn all_tag_names(&self) -> DomainResult<Vec<String>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name ASC")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Look up a tag by name (normalized before matching)
    pub async fn find_by_name(&self, name: &str) -> DomainResult<Option<Tag>> {
        let Some(name) = normalize_tag_name(name) else {
            return Ok(None);
        };
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let tag = conn
            .query_row(
                "SELECT id, name FROM tags WHERE name = ?",
                params![name],
                |row| Ok(Tag::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(tag)
    }

    /// How many of the user's items carry each tag, most used first.
    /// Tags the user never applied do not appear.
    pub async fn tag_counts_for_user(&self, user_id: i64) -> DomainResult<Vec<TagCount>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(it.item_id) AS count
             FROM tags t
             JOIN item_tags it ON t.id = it.tag_id
             JOIN items i ON it.item_id = i.id
             WHERE i.user_id = ?
             GROUP BY t.name
             ORDER BY count DESC, t.name ASC",
        )?;
        let counts = stmt
            .query_map(params![user_id], |row| {
                Ok(TagCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Autocomplete: case-insensitive substring match over the vocabulary
    pub async fn suggest(&self, partial: &str) -> DomainResult<Vec<String>> {
        let needle = partial.trim().to_lowercase();
        let names = self.all_tag_names().await?;
        Ok(names
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Drop tags no item refers to any more. Returns how many were removed.
    pub async fn prune_unused(&self) -> DomainResult<usize> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        let removed = prune_unused_tags(conn)?;
        if removed > 0 {
            log::debug!("Pruned {} unused tags", removed);
        }
        Ok(removed)
    }
}

fn prune_unused_tags(conn: &Connection) -> DomainResult<usize> {
    Ok(conn.execute(
        "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM item_tags)",
        [],
    )?)
}
