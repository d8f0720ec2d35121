//! Database Connection and Setup
//!
//! Manages the SQLite connection handle and schema migrations.
//! The handle is created once by `init_db`, cloned into every repository and
//! released with `DbState::close`.

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Shared connection slot. `None` once the database has been closed.
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    pub conn: SharedConnection,
}

impl DbState {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Handle to pass into repositories
    pub fn handle(&self) -> SharedConnection {
        self.conn.clone()
    }

    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Close the connection. Repositories holding the handle fail with a
    /// storage error afterwards.
    pub async fn close(&self) -> DomainResult<()> {
        let taken = self.conn.lock().await.take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| DomainError::from(e))?;
            log::info!("Database closed");
        }
        Ok(())
    }
}

/// Borrow the open connection out of a locked slot
pub(crate) fn open_conn(slot: &Option<Connection>) -> DomainResult<&Connection> {
    slot.as_ref()
        .ok_or_else(|| DomainError::Storage("Database not initialized".to_string()))
}

/// Mutable variant of [`open_conn`], needed to start transactions
pub(crate) fn open_conn_mut(slot: &mut Option<Connection>) -> DomainResult<&mut Connection> {
    slot.as_mut()
        .ok_or_else(|| DomainError::Storage("Database not initialized".to_string()))
}

/// Initialize database at path (":memory:" for a private in-memory database)
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DomainError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }
        Connection::open(db_path)?
    };

    configure(&conn)?;
    run_migrations(&conn)?;
    log::info!("Database ready at {}", db_path.display());

    Ok(DbState::new(conn))
}

/// Convenience for tests and tools
pub async fn init_in_memory() -> DomainResult<DbState> {
    init_db(Path::new(":memory:")).await
}

fn configure(conn: &Connection) -> DomainResult<()> {
    // Cascading deletes rely on this; SQLite leaves it off by default.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            api_token TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            type TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS bookmarks (
            item_id INTEGER PRIMARY KEY,
            url TEXT NOT NULL,
            description TEXT,
            favicon TEXT,
            thumbnail TEXT,
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS notes (
            item_id INTEGER PRIMARY KEY,
            content TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS recipes (
            item_id INTEGER PRIMARY KEY,
            ingredients TEXT NOT NULL DEFAULT '',
            instructions TEXT NOT NULL DEFAULT '',
            notes TEXT,
            thumbnail TEXT,
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS recipe_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(recipe_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS media (
            item_id INTEGER PRIMARY KEY,
            file_path TEXT NOT NULL,
            mime_type TEXT,
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS drawings (
            item_id INTEGER PRIMARY KEY,
            file_path TEXT NOT NULL,
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS list_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_id INTEGER NOT NULL,
            content TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(list_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS rated_list_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rated_list_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            score INTEGER NOT NULL CHECK(score >= 0 AND score <= 10),
            note TEXT,
            FOREIGN KEY(rated_list_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS item_tags (
            item_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (item_id, tag_id),
            FOREIGN KEY(item_id) REFERENCES items(id) ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );",
    )?;

    // Added after the first release: where an imported recipe came from
    if !column_exists(conn, "recipes", "source_url")? {
        conn.execute("ALTER TABLE recipes ADD COLUMN source_url TEXT", [])
            .map_err(|e| DomainError::Storage(format!("Failed to add source_url: {}", e)))?;
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_items_user_type ON items(user_id, type, created_at);
         CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id);
         CREATE INDEX IF NOT EXISTS idx_list_items_list ON list_items(list_id);
         CREATE INDEX IF NOT EXISTS idx_rated_list_items_list ON rated_list_items(rated_list_id);
         CREATE INDEX IF NOT EXISTS idx_recipe_images_recipe ON recipe_images(recipe_id);",
    )?;

    Ok(())
}
