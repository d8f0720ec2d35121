//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// `NotFound` covers both "absent" and "owned by someone else" so callers
/// cannot discover other users' items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Fetch failed: {0}")]
    ExternalFetch(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    pub fn not_found(what: &str, id: i64) -> Self {
        DomainError::NotFound(format!("{} {}", what, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DomainError::not_found("Item", 4).to_string(), "Not found: Item 4");
        assert_eq!(
            DomainError::validation("score must be between 0 and 10").to_string(),
            "Invalid input: score must be between 0 and 10"
        );
    }

    #[test]
    fn test_storage_error_from_rusqlite() {
        let err: DomainError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DomainError::Storage(_)));
    }
}
