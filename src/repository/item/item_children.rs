//! Child Row Operations
//!
//! Checklist entries, rated-list entries and recipe images hang off a parent
//! item. Every read and write re-checks that the parent belongs to the
//! requesting user, so a child id alone never grants access.
//! Each mutation and the parent's `updated_at` bump commit together.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{
    require, validate_score, DomainError, DomainResult, ItemType, ListItem, RatedListItem, RecipeImage,
};
use crate::repository::db::{open_conn, open_conn_mut};
use super::item_repo::{
    load_list_items, load_rated_items, load_recipe_images, owned_item_type, row_to_list_item,
    row_to_rated_item, touch_item, ItemRepository,
};

/// Fail with `NotFound` unless `parent_id` is the user's item, and with a
/// validation error if it is the wrong kind of item
fn require_parent(conn: &Connection, user_id: i64, parent_id: i64, expected: ItemType) -> DomainResult<()> {
    match owned_item_type(conn, user_id, parent_id)? {
        None => Err(DomainError::not_found("Item", parent_id)),
        Some(t) if t != expected => Err(DomainError::validation(format!(
            "item {} is a {}, not a {}",
            parent_id, t, expected
        ))),
        Some(_) => Ok(()),
    }
}

/// Trait for checklist entry operations
#[async_trait]
pub trait ListItemOperations {
    async fn add_list_item(&self, user_id: i64, list_id: i64, content: &str) -> DomainResult<ListItem>;

    async fn list_items(&self, user_id: i64, list_id: i64) -> DomainResult<Vec<ListItem>>;

    async fn get_list_item(&self, user_id: i64, id: i64) -> DomainResult<ListItem>;

    async fn update_list_item(&self, user_id: i64, id: i64, content: &str) -> DomainResult<ListItem>;

    /// Flip the completed flag; returns the new state
    async fn toggle_list_item(&self, user_id: i64, id: i64) -> DomainResult<bool>;

    async fn delete_list_item(&self, user_id: i64, id: i64) -> DomainResult<()>;
}

/// Trait for rated list entry operations
#[async_trait]
pub trait RatedListItemOperations {
    async fn add_rated_list_item(
        &self,
        user_id: i64,
        list_id: i64,
        title: &str,
        score: i32,
        note: Option<&str>,
    ) -> DomainResult<RatedListItem>;

    async fn rated_list_items(&self, user_id: i64, list_id: i64) -> DomainResult<Vec<RatedListItem>>;

    async fn get_rated_list_item(&self, user_id: i64, id: i64) -> DomainResult<RatedListItem>;

    async fn update_rated_list_item(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        score: i32,
        note: Option<&str>,
    ) -> DomainResult<RatedListItem>;

    async fn delete_rated_list_item(&self, user_id: i64, id: i64) -> DomainResult<()>;
}

/// Trait for recipe image operations
#[async_trait]
pub trait RecipeImageOperations {
    async fn add_recipe_image(
        &self,
        user_id: i64,
        recipe_id: i64,
        file_path: &str,
        display_order: i32,
    ) -> DomainResult<RecipeImage>;

    async fn recipe_images(&self, user_id: i64, recipe_id: i64) -> DomainResult<Vec<RecipeImage>>;

    /// Remove every image of the recipe stored under `file_path`
    async fn delete_recipe_image(&self, user_id: i64, recipe_id: i64, file_path: &str) -> DomainResult<()>;
}

fn find_list_item(conn: &Connection, user_id: i64, id: i64) -> DomainResult<ListItem> {
    conn.query_row(
        "SELECT li.id, li.list_id, li.content, li.completed FROM list_items li
         JOIN items i ON li.list_id = i.id
         WHERE li.id = ? AND i.user_id = ?",
        params![id, user_id],
        row_to_list_item,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found("List item", id))
}

fn find_rated_item(conn: &Connection, user_id: i64, id: i64) -> DomainResult<RatedListItem> {
    conn.query_row(
        "SELECT r.id, r.rated_list_id, r.title, r.score, r.note FROM rated_list_items r
         JOIN items i ON r.rated_list_id = i.id
         WHERE r.id = ? AND i.user_id = ?",
        params![id, user_id],
        row_to_rated_item,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found("Rated list item", id))
}

#[async_trait]
impl ListItemOperations for ItemRepository {
    async fn add_list_item(&self, user_id: i64, list_id: i64, content: &str) -> DomainResult<ListItem> {
        require("content", content)?;
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        require_parent(&tx, user_id, list_id, ItemType::List)?;
        tx.execute(
            "INSERT INTO list_items (list_id, content) VALUES (?, ?)",
            params![list_id, content.trim()],
        )?;
        let id = tx.last_insert_rowid();
        touch_item(&tx, list_id)?;
        tx.commit()?;

        Ok(ListItem {
            id,
            list_id,
            content: content.trim().to_string(),
            completed: false,
        })
    }

    async fn list_items(&self, user_id: i64, list_id: i64) -> DomainResult<Vec<ListItem>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        require_parent(conn, user_id, list_id, ItemType::List)?;
        load_list_items(conn, list_id)
    }

    async fn get_list_item(&self, user_id: i64, id: i64) -> DomainResult<ListItem> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        find_list_item(conn, user_id, id)
    }

    async fn update_list_item(&self, user_id: i64, id: i64, content: &str) -> DomainResult<ListItem> {
        require("content", content)?;
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let mut item = find_list_item(&tx, user_id, id)?;
        tx.execute(
            "UPDATE list_items SET content = ? WHERE id = ?",
            params![content.trim(), id],
        )?;
        touch_item(&tx, item.list_id)?;
        tx.commit()?;

        item.content = content.trim().to_string();
        Ok(item)
    }

    async fn toggle_list_item(&self, user_id: i64, id: i64) -> DomainResult<bool> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let item = find_list_item(&tx, user_id, id)?;
        let completed = !item.completed;
        tx.execute(
            "UPDATE list_items SET completed = ? WHERE id = ?",
            params![completed, id],
        )?;
        touch_item(&tx, item.list_id)?;
        tx.commit()?;
        Ok(completed)
    }

    async fn delete_list_item(&self, user_id: i64, id: i64) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let item = find_list_item(&tx, user_id, id)?;
        tx.execute("DELETE FROM list_items WHERE id = ?", params![id])?;
        touch_item(&tx, item.list_id)?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RatedListItemOperations for ItemRepository {
    async fn add_rated_list_item(
        &self,
        user_id: i64,
        list_id: i64,
        title: &str,
        score: i32,
        note: Option<&str>,
    ) -> DomainResult<RatedListItem> {
        require("title", title)?;
        let score = validate_score(score)?;
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        require_parent(&tx, user_id, list_id, ItemType::RatedList)?;
        tx.execute(
            "INSERT INTO rated_list_items (rated_list_id, title, score, note) VALUES (?, ?, ?, ?)",
            params![list_id, title.trim(), score, note],
        )?;
        let id = tx.last_insert_rowid();
        touch_item(&tx, list_id)?;
        tx.commit()?;

        Ok(RatedListItem {
            id,
            rated_list_id: list_id,
            title: title.trim().to_string(),
            score,
            note: note.map(str::to_string),
        })
    }

    async fn rated_list_items(&self, user_id: i64, list_id: i64) -> DomainResult<Vec<RatedListItem>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        require_parent(conn, user_id, list_id, ItemType::RatedList)?;
        load_rated_items(conn, list_id)
    }

    async fn get_rated_list_item(&self, user_id: i64, id: i64) -> DomainResult<RatedListItem> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        find_rated_item(conn, user_id, id)
    }

    async fn update_rated_list_item(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        score: i32,
        note: Option<&str>,
    ) -> DomainResult<RatedListItem> {
        require("title", title)?;
        let score = validate_score(score)?;
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let existing = find_rated_item(&tx, user_id, id)?;
        tx.execute(
            "UPDATE rated_list_items SET title = ?, score = ?, note = ? WHERE id = ?",
            params![title.trim(), score, note, id],
        )?;
        touch_item(&tx, existing.rated_list_id)?;
        tx.commit()?;

        Ok(RatedListItem {
            id,
            rated_list_id: existing.rated_list_id,
            title: title.trim().to_string(),
            score,
            note: note.map(str::to_string),
        })
    }

    async fn delete_rated_list_item(&self, user_id: i64, id: i64) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let existing = find_rated_item(&tx, user_id, id)?;
        tx.execute("DELETE FROM rated_list_items WHERE id = ?", params![id])?;
        touch_item(&tx, existing.rated_list_id)?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RecipeImageOperations for ItemRepository {
    async fn add_recipe_image(
        &self,
        user_id: i64,
        recipe_id: i64,
        file_path: &str,
        display_order: i32,
    ) -> DomainResult<RecipeImage> {
        require("file_path", file_path)?;
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        require_parent(&tx, user_id, recipe_id, ItemType::Recipe)?;
        tx.execute(
            "INSERT INTO recipe_images (recipe_id, file_path, display_order) VALUES (?, ?, ?)",
            params![recipe_id, file_path, display_order],
        )?;
        let id = tx.last_insert_rowid();
        touch_item(&tx, recipe_id)?;
        tx.commit()?;

        Ok(RecipeImage {
            id,
            file_path: file_path.to_string(),
            display_order,
        })
    }

    async fn recipe_images(&self, user_id: i64, recipe_id: i64) -> DomainResult<Vec<RecipeImage>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        require_parent(conn, user_id, recipe_id, ItemType::Recipe)?;
        load_recipe_images(conn, recipe_id)
    }

    async fn delete_recipe_image(&self, user_id: i64, recipe_id: i64, file_path: &str) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        require_parent(&tx, user_id, recipe_id, ItemType::Recipe)?;
        let deleted = tx.execute(
            "DELETE FROM recipe_images WHERE recipe_id = ? AND file_path = ?",
            params![recipe_id, file_path],
        )?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("Recipe image {}", file_path)));
        }
        touch_item(&tx, recipe_id)?;
        tx.commit()?;
        Ok(())
    }
}
