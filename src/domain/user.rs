//! User and Session entities
//!
//! Password hashing and cookie handling live in the auth layer; these records
//! only carry what it stores.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Unix millis
    pub created_at: i64,
}

impl Entity for User {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A login session identified by an opaque token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    /// Unix millis
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis > self.expires_at
    }
}
