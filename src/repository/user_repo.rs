//! User Repository
//!
//! Users, API tokens and login sessions. Password checking and cookies are
//! the auth layer's business; this only stores what it hands over.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use std::time::Duration;

use crate::domain::{require, DomainError, DomainResult, Session, User};
use crate::repository::db::{open_conn, SharedConnection};

const API_TOKEN_BYTES: usize = 32;
const SESSION_ID_BYTES: usize = 16;

#[derive(Clone)]
pub struct UserRepository {
    conn: SharedConnection,
}

impl UserRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Register a user. The hash is stored as given.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> DomainResult<User> {
        require("username", username)?;
        require("password hash", password_hash)?;
        let username = username.trim();

        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
            params![username, password_hash, now],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                DomainError::Conflict(format!("username '{}' is taken", username))
            }
            _ => DomainError::from(e),
        })?;

        let id = conn.last_insert_rowid();
        log::info!("Registered user {} ({})", username, id);
        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            api_token: None,
            created_at: now,
        })
    }

    pub async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let user = conn
            .query_row(
                "SELECT id, username, password_hash, api_token, created_at FROM users WHERE username = ?",
                params![username.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let user = conn
            .query_row(
                "SELECT id, username, password_hash, api_token, created_at FROM users WHERE id = ?",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// The user's API token, generated on first request
    pub async fn api_token(&self, user_id: i64) -> DomainResult<String> {
        let existing = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?
            .api_token
            .filter(|t| !t.is_empty());

        match existing {
            Some(token) => Ok(token),
            None => self.regenerate_api_token(user_id).await,
        }
    }

    /// Replace the user's API token; the old one stops working immediately
    pub async fn regenerate_api_token(&self, user_id: i64) -> DomainResult<String> {
        let token = generate_token(API_TOKEN_BYTES);

        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let updated = conn.execute(
            "UPDATE users SET api_token = ? WHERE id = ?",
            params![token, user_id],
        )?;
        if updated == 0 {
            return Err(DomainError::not_found("User", user_id));
        }
        log::info!("API token regenerated for user {}", user_id);
        Ok(token)
    }

    pub async fn user_id_for_token(&self, token: &str) -> DomainResult<Option<i64>> {
        if token.is_empty() {
            return Ok(None);
        }
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let id = conn
            .query_row(
                "SELECT id FROM users WHERE api_token = ?",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub async fn create_session(&self, user_id: i64, ttl: Duration) -> DomainResult<Session> {
        let session = Session {
            id: generate_token(SESSION_ID_BYTES),
            user_id,
            expires_at: chrono::Utc::now().timestamp_millis()
                + i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX / 2),
        };

        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        conn.execute(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)",
            params![session.id, session.user_id, session.expires_at],
        )?;
        Ok(session)
    }

    /// User behind a session. Expired sessions are removed and yield `None`.
    pub async fn session_user(&self, session_id: &str) -> DomainResult<Option<i64>> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;

        let session = conn
            .query_row(
                "SELECT id, user_id, expires_at FROM sessions WHERE id = ?",
                params![session_id],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()?;

        match session {
            Some(s) if s.is_expired(chrono::Utc::now().timestamp_millis()) => {
                conn.execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
                log::debug!("Session for user {} expired", s.user_id);
                Ok(None)
            }
            Some(s) => Ok(Some(s.user_id)),
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, session_id: &str) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        conn.execute("DELETE FROM sessions WHERE id = ?", params![session_id])?;
        Ok(())
    }

    /// Remove every expired session; returns how many went
    pub async fn purge_expired_sessions(&self) -> DomainResult<usize> {
        let guard = self.conn.lock().await;
        let conn = open_conn(&guard)?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?",
            params![chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(removed)
    }
}

/// Random URL-safe token of `len` bytes of entropy
fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        api_token: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token(API_TOKEN_BYTES);
        let b = generate_token(API_TOKEN_BYTES);
        assert_ne!(a, b);
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
