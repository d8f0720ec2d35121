//! Item Repository - Core CRUD Operations
//!
//! SQLite-backed implementation for Item CRUD operations.
//! An item is one `items` row plus one row in the extension table of its type;
//! both are always written in the same transaction.
//! Child-table operations (list entries, rated entries, recipe images) are in
//! `item_children`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{
    normalize_tag_name, validate_score, Bookmark, DomainError, DomainResult, Drawing, Item,
    ItemPayload, ItemType, ItemUpdate, ItemView, ListItem, Media, NewItem, NewPayload, Note,
    PayloadUpdate, RatedListItem, Recipe, RecipeImage,
};
use crate::repository::db::{open_conn, open_conn_mut, SharedConnection};
use crate::repository::tag::{load_item_tags, replace_item_tags};
use crate::repository::traits::{Repository, SearchableRepository};
use crate::search;

const ITEM_COLUMNS: &str = "i.id, i.user_id, i.title, i.type, i.created_at, i.updated_at";

/// Which items `list` returns: one type, optionally only those carrying a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub item_type: ItemType,
    /// Exact tag name (normalized before matching)
    pub tag: Option<String>,
}

impl ItemFilter {
    pub fn of_type(item_type: ItemType) -> Self {
        Self { item_type, tag: None }
    }

    /// Items of `item_type` carrying `tag`. A blank tag matches nothing.
    pub fn tagged(item_type: ItemType, tag: impl Into<String>) -> Self {
        Self {
            item_type,
            tag: Some(tag.into()),
        }
    }
}

/// SQLite implementation of Item repository
#[derive(Clone)]
pub struct ItemRepository {
    pub(super) conn: SharedConnection,
}

impl ItemRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Repository<ItemView> for ItemRepository {
    type New = NewItem;
    type Changes = ItemUpdate;
    type Filter = ItemFilter;

    async fn create(&self, user_id: i64, new: &NewItem) -> DomainResult<i64> {
        new.validate()?;

        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp_millis();
        tx.execute(
            "INSERT INTO items (user_id, title, type, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![user_id, new.title.trim(), new.item_type().as_str(), now, now],
        )?;
        let item_id = tx.last_insert_rowid();

        insert_extension(&tx, item_id, &new.payload)?;
        replace_item_tags(&tx, item_id, &new.tags)?;
        tx.commit()?;

        log::debug!("Created {} {} for user {}", new.item_type(), item_id, user_id);
        Ok(item_id)
    }

    async fn get(&self, user_id: i64, id: i64) -> DomainResult<ItemView> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        load_view(conn, user_id, id)
    }

    async fn list(&self, user_id: i64, filter: &ItemFilter) -> DomainResult<Vec<ItemView>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let tag = match filter.tag.as_deref() {
            Some(raw) => match normalize_tag_name(raw) {
                Some(tag) => Some(tag),
                // No item carries a blank tag
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        let mut sql = format!(
            "SELECT {} FROM items i WHERE i.user_id = ?1 AND i.type = ?2",
            ITEM_COLUMNS
        );
        if tag.is_some() {
            sql.push_str(
                " AND i.id IN (SELECT it.item_id FROM item_tags it
                               JOIN tags t ON it.tag_id = t.id WHERE t.name = ?3)",
            );
        }
        sql.push_str(" ORDER BY i.created_at DESC, i.id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let type_name = filter.item_type.as_str();
        let items = match &tag {
            Some(tag) => stmt
                .query_map(params![user_id, type_name, tag], row_to_item)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![user_id, type_name], row_to_item)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        items
            .into_iter()
            .map(|item| item.and_then(|item| assemble_view(conn, item)))
            .collect()
    }

    async fn update(&self, user_id: i64, id: i64, changes: &ItemUpdate) -> DomainResult<ItemView> {
        let mut guard = self.conn.lock().await;
        let conn = open_conn_mut(&mut guard)?;

        let tx = conn.transaction()?;
        let item_type = owned_item_type(&tx, user_id, id)?
            .ok_or_else(|| DomainError::not_found("Item", id))?;
        changes.validate_for(item_type)?;

        let now = chrono::Utc::now().timestamp_millis();
        tx.execute(
            "UPDATE items SET title = COALESCE(?, title), updated_at = ? WHERE id = ? AND user_id = ?",
            params![changes.title.as_deref().map(str::trim), now, id, user_id],
        )?;

        if let Some(payload) = &changes.payload {
            update_extension(&tx, id, payload)?;
        }
        if let Some(tags) = &changes.tags {
            replace_item_tags(&tx, id, tags)?;
        }
        tx.commit()?;

        log::debug!("Updated {} {} for user {}", item_type, id, user_id);
        load_view(conn, user_id, id)
    }

    async fn delete(&self, user_id: i64, id: i64) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        // Extension row, children and tag links go with it (ON DELETE CASCADE)
        let deleted = conn.execute(
            "DELETE FROM items WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(DomainError::not_found("Item", id));
        }

        log::debug!("Deleted item {} for user {}", id, user_id);
        Ok(())
    }
}

#[async_trait]
impl SearchableRepository<ItemView> for ItemRepository {
    async fn search(&self, user_id: i64, filter: &ItemFilter, query: &str) -> DomainResult<Vec<ItemView>> {
        let candidates = self.list(user_id, filter).await?;
        Ok(search::rank(candidates, query, search::fields_for(filter.item_type)))
    }
}

/// Type of an item if it exists and belongs to `user_id`
pub(super) fn owned_item_type(conn: &Connection, user_id: i64, id: i64) -> DomainResult<Option<ItemType>> {
    let type_name: Option<String> = conn
        .query_row(
            "SELECT type FROM items WHERE id = ? AND user_id = ?",
            params![id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    type_name.map(|t| t.parse()).transpose()
}

/// Bump `updated_at` after a change to one of the item's child rows
pub(super) fn touch_item(conn: &Connection, id: i64) -> DomainResult<()> {
    conn.execute(
        "UPDATE items SET updated_at = ? WHERE id = ?",
        params![chrono::Utc::now().timestamp_millis(), id],
    )?;
    Ok(())
}

fn load_view(conn: &Connection, user_id: i64, id: i64) -> DomainResult<ItemView> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM items i WHERE i.id = ? AND i.user_id = ?", ITEM_COLUMNS),
            params![id, user_id],
            row_to_item,
        )
        .optional()?
        .ok_or_else(|| DomainError::not_found("Item", id))??;
    assemble_view(conn, item)
}

fn assemble_view(conn: &Connection, item: Item) -> DomainResult<ItemView> {
    let payload = load_payload(conn, &item)?;
    let tags = load_item_tags(conn, item.id)?;
    Ok(ItemView { item, tags, payload })
}

fn insert_extension(conn: &Connection, item_id: i64, payload: &NewPayload) -> DomainResult<()> {
    match payload {
        NewPayload::Bookmark(b) => {
            conn.execute(
                "INSERT INTO bookmarks (item_id, url, description, favicon, thumbnail) VALUES (?, ?, ?, ?, ?)",
                params![item_id, b.url.trim(), b.description, b.favicon, b.thumbnail],
            )?;
        }
        NewPayload::Note(n) => {
            conn.execute(
                "INSERT INTO notes (item_id, content) VALUES (?, ?)",
                params![item_id, n.content],
            )?;
        }
        NewPayload::Recipe(r) => {
            conn.execute(
                "INSERT INTO recipes (item_id, ingredients, instructions, notes, thumbnail, source_url)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![item_id, r.ingredients, r.instructions, r.notes, r.thumbnail, r.source_url],
            )?;
            for (order, path) in r.image_paths.iter().enumerate() {
                conn.execute(
                    "INSERT INTO recipe_images (recipe_id, file_path, display_order) VALUES (?, ?, ?)",
                    params![item_id, path, order as i64],
                )?;
            }
        }
        NewPayload::Media(m) => {
            conn.execute(
                "INSERT INTO media (item_id, file_path, mime_type) VALUES (?, ?, ?)",
                params![item_id, m.file_path, m.mime_type],
            )?;
        }
        NewPayload::Drawing(d) => {
            conn.execute(
                "INSERT INTO drawings (item_id, file_path) VALUES (?, ?)",
                params![item_id, d.file_path],
            )?;
        }
        // Entries live in child tables, written in the same transaction
        NewPayload::List(entries) => {
            for entry in entries {
                conn.execute(
                    "INSERT INTO list_items (list_id, content, completed) VALUES (?, ?, ?)",
                    params![item_id, entry.content.trim(), entry.completed],
                )?;
            }
        }
        NewPayload::RatedList(entries) => {
            for entry in entries {
                conn.execute(
                    "INSERT INTO rated_list_items (rated_list_id, title, score, note) VALUES (?, ?, ?, ?)",
                    params![item_id, entry.title.trim(), validate_score(entry.score)?, entry.note],
                )?;
            }
        }
    }
    Ok(())
}

/// Only columns given as `Some` change; `COALESCE` keeps the rest
fn update_extension(conn: &Connection, item_id: i64, payload: &PayloadUpdate) -> DomainResult<()> {
    match payload {
        PayloadUpdate::Bookmark(b) => conn.execute(
            "UPDATE bookmarks SET url = COALESCE(?, url), description = COALESCE(?, description),
                 favicon = COALESCE(?, favicon), thumbnail = COALESCE(?, thumbnail)
             WHERE item_id = ?",
            params![b.url.as_deref().map(str::trim), b.description, b.favicon, b.thumbnail, item_id],
        )?,
        PayloadUpdate::Note(n) => conn.execute(
            "UPDATE notes SET content = COALESCE(?, content) WHERE item_id = ?",
            params![n.content, item_id],
        )?,
        PayloadUpdate::Recipe(r) => conn.execute(
            "UPDATE recipes SET ingredients = COALESCE(?, ingredients),
                 instructions = COALESCE(?, instructions), notes = COALESCE(?, notes),
                 thumbnail = COALESCE(?, thumbnail), source_url = COALESCE(?, source_url)
             WHERE item_id = ?",
            params![r.ingredients, r.instructions, r.notes, r.thumbnail, r.source_url, item_id],
        )?,
        PayloadUpdate::Media(m) => conn.execute(
            "UPDATE media SET file_path = COALESCE(?, file_path), mime_type = COALESCE(?, mime_type)
             WHERE item_id = ?",
            params![m.file_path, m.mime_type, item_id],
        )?,
        PayloadUpdate::Drawing(d) => conn.execute(
            "UPDATE drawings SET file_path = COALESCE(?, file_path) WHERE item_id = ?",
            params![d.file_path, item_id],
        )?,
    };
    Ok(())
}

fn load_payload(conn: &Connection, item: &Item) -> DomainResult<ItemPayload> {
    let id = item.id;
    let payload = match item.item_type {
        ItemType::Bookmark => ItemPayload::Bookmark(conn.query_row(
            "SELECT url, description, favicon, thumbnail FROM bookmarks WHERE item_id = ?",
            params![id],
            |row| {
                Ok(Bookmark {
                    url: row.get(0)?,
                    description: row.get(1)?,
                    favicon: row.get(2)?,
                    thumbnail: row.get(3)?,
                })
            },
        )?),
        ItemType::Note => ItemPayload::Note(conn.query_row(
            "SELECT content FROM notes WHERE item_id = ?",
            params![id],
            |row| Ok(Note { content: row.get(0)? }),
        )?),
        ItemType::Recipe => {
            let mut recipe = conn.query_row(
                "SELECT ingredients, instructions, notes, thumbnail, source_url FROM recipes WHERE item_id = ?",
                params![id],
                |row| {
                    Ok(Recipe {
                        ingredients: row.get(0)?,
                        instructions: row.get(1)?,
                        notes: row.get(2)?,
                        thumbnail: row.get(3)?,
                        source_url: row.get(4)?,
                        images: Vec::new(),
                    })
                },
            )?;
            recipe.images = load_recipe_images(conn, id)?;
            ItemPayload::Recipe(recipe)
        }
        ItemType::List => ItemPayload::List(load_list_items(conn, id)?),
        ItemType::RatedList => ItemPayload::RatedList(load_rated_items(conn, id)?),
        ItemType::Media => ItemPayload::Media(conn.query_row(
            "SELECT file_path, mime_type FROM media WHERE item_id = ?",
            params![id],
            |row| {
                Ok(Media {
                    file_path: row.get(0)?,
                    mime_type: row.get(1)?,
                })
            },
        )?),
        ItemType::Drawing => ItemPayload::Drawing(conn.query_row(
            "SELECT file_path FROM drawings WHERE item_id = ?",
            params![id],
            |row| Ok(Drawing { file_path: row.get(0)? }),
        )?),
    };
    Ok(payload)
}

/// Open entries first, then insertion order
pub(super) fn load_list_items(conn: &Connection, list_id: i64) -> DomainResult<Vec<ListItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, list_id, content, completed FROM list_items
         WHERE list_id = ? ORDER BY completed ASC, id ASC",
    )?;
    let items = stmt
        .query_map(params![list_id], row_to_list_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Best score first, then alphabetical
pub(super) fn load_rated_items(conn: &Connection, list_id: i64) -> DomainResult<Vec<RatedListItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, rated_list_id, title, score, note FROM rated_list_items
         WHERE rated_list_id = ? ORDER BY score DESC, title ASC",
    )?;
    let items = stmt
        .query_map(params![list_id], row_to_rated_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub(super) fn load_recipe_images(conn: &Connection, recipe_id: i64) -> DomainResult<Vec<RecipeImage>> {
    let mut stmt = conn.prepare(
        "SELECT id, file_path, display_order FROM recipe_images
         WHERE recipe_id = ? ORDER BY display_order ASC, id ASC",
    )?;
    let images = stmt
        .query_map(params![recipe_id], |row| {
            Ok(RecipeImage {
                id: row.get(0)?,
                file_path: row.get(1)?,
                display_order: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

/// Convert a database row to Item. The stored type name is parsed
/// separately so an unknown discriminator surfaces as a domain error.
fn row_to_item(row: &Row) -> rusqlite::Result<DomainResult<Item>> {
    let type_name: String = row.get(3)?;
    let item = Item {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        item_type: ItemType::Bookmark,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    };
    Ok(type_name.parse().map(|item_type| Item { item_type, ..item }))
}

pub(super) fn row_to_list_item(row: &Row) -> rusqlite::Result<ListItem> {
    Ok(ListItem {
        id: row.get(0)?,
        list_id: row.get(1)?,
        content: row.get(2)?,
        completed: row.get::<_, i64>(3)? != 0,
    })
}

pub(super) fn row_to_rated_item(row: &Row) -> rusqlite::Result<RatedListItem> {
    Ok(RatedListItem {
        id: row.get(0)?,
        rated_list_id: row.get(1)?,
        title: row.get(2)?,
        score: row.get(3)?,
        note: row.get(4)?,
    })
}
