//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
pub mod db;
pub mod item;
pub mod tag;
mod user_repo;


pub use traits::{Repository, SearchableRepository};
pub use db::{init_db, init_in_memory, DbState, SharedConnection};
pub use item::{
    ItemFilter, ItemRepository, ListItemOperations, RatedListItemOperations, RecipeImageOperations,
};
pub use tag::{ItemTagOperations, TagRepository};
pub use user_repo::UserRepository;
