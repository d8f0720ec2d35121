//! Item-Tag Relationship Operations
//!
//! Operations for managing the many-to-many relationship between items and tags.
//! An item's tag set is always replaced as a whole: delete every association,
//! then insert the submitted set, inside one transaction. Two writers racing on
//! the same item therefore end with whichever committed last.

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{normalize_tag_name, normalize_tags, DomainResult};
use crate::repository::db::{open_conn, open_conn_mut};

/// Trait for item-tag relationship operations
#[async_trait]
pub trait ItemTagOperations {
    /// Replace the item's tags with the normalized `names`; returns the stored set
    async fn set_item_tags(&self, item_id: i64, names: &[String]) -> DomainResult<Vec<String>>;

    /// Tag names of an item. Callers must not rely on the order.
    async fn tags_for_item(&self, item_id: i64) -> DomainResult<Vec<String>>;

    /// Ids of the user's items carrying the tag
    async fn items_with_tag(&self, user_id: i64, name: &str) -> DomainResult<Vec<i64>>;
}

#[async_trait]
impl ItemTagOperations for super::tag_repo::TagRepository {
    async fn set_item_tags(&self, item_id: i64, names: &[String]) -> DomainResult<Vec<String>> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let stored = replace_item_tags(&tx, item_id, names)?;
        tx.commit()?;

        log::debug!("Item {} tags set to {:?}", item_id, stored);
        Ok(stored)
    }

    async fn tags_for_item(&self, item_id: i64) -> DomainResult<Vec<String>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        load_item_tags(conn, item_id)
    }

    async fn items_with_tag(&self, user_id: i64, name: &str) -> DomainResult<Vec<i64>> {
        let Some(name) = normalize_tag_name(name) else {
            return Ok(Vec::new());
        };
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let mut stmt = conn.prepare(
            "SELECT it.item_id FROM item_tags it
             JOIN tags t ON it.tag_id = t.id
             JOIN items i ON it.item_id = i.id
             WHERE t.name = ? AND i.user_id = ?
             ORDER BY i.created_at DESC, i.id DESC",
        )?;
        let ids = stmt
            .query_map(params![name, user_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

/// Replace an item's associations on an open connection or transaction.
/// The caller owns the transaction boundary.
pub(crate) fn replace_item_tags(
    conn: &Connection,
    item_id: i64,
    names: &[String],
) -> DomainResult<Vec<String>> {
    let names = normalize_tags(names);

    conn.execute("DELETE FROM item_tags WHERE item_id = ?", params![item_id])?;

    for name in &names {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?)", params![name])?;
        let tag_id: i64 =
            conn.query_row("SELECT id FROM tags WHERE name = ?", params![name], |row| row.get(0))?;
        conn.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)",
            params![item_id, tag_id],
        )?;
    }

    Ok(names)
}

/// Tag names of one item, alphabetically
pub(crate) fn load_item_tags(conn: &Connection, item_id: i64) -> DomainResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t
         JOIN item_tags it ON t.id = it.tag_id
         WHERE it.item_id = ?
         ORDER BY t.name ASC",
    )?;
    let tags = stmt
        .query_map(params![item_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}
