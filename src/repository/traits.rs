//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Every operation is scoped to the requesting user; an entity owned by
//! somebody else behaves exactly like a missing one.

use async_trait::async_trait;
use crate::domain::{Entity, DomainResult};

/// Core repository trait for user-scoped CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Input for `create`
    type New: Send + Sync;
    /// Partial update for `update`
    type Changes: Send + Sync;
    /// Selection criteria for `list`
    type Filter: Send + Sync;

    /// Create a new entity, returning its id
    async fn create(&self, user_id: i64, new: &Self::New) -> DomainResult<T::Id>;

    /// Find entity by ID, `NotFound` if absent or not owned by `user_id`
    async fn get(&self, user_id: i64, id: T::Id) -> DomainResult<T>;

    /// List the user's entities matching the filter
    async fn list(&self, user_id: i64, filter: &Self::Filter) -> DomainResult<Vec<T>>;

    /// Apply a partial update and return the stored result
    async fn update(&self, user_id: i64, id: T::Id, changes: &Self::Changes) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, user_id: i64, id: T::Id) -> DomainResult<()>;
}

/// Extension for repositories that support text search
#[async_trait]
pub trait SearchableRepository<T: Entity>: Repository<T> {
    /// Rank the entities selected by `filter` against a free-text query
    async fn search(&self, user_id: i64, filter: &Self::Filter, query: &str) -> DomainResult<Vec<T>>;
}
