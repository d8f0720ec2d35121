//! Item Repository Module
//!
//! This module provides item repository functionality split into specialized sub-modules:
//! - item_repo: Core CRUD operations, search over one category
//! - item_children: List entries, rated entries and recipe images

mod item_repo;
mod item_children;

pub use item_repo::{ItemFilter, ItemRepository};

// Re-export all operation traits so they can be used by importing ItemRepository
pub use item_children::{ListItemOperations, RatedListItemOperations, RecipeImageOperations};
