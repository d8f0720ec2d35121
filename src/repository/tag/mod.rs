//! Tag Repository Module
//!
//! - tag_repo: vocabulary, per-user counts, autocomplete
//! - item_tag: Item-Tag relationships

mod tag_repo;
mod item_tag;

pub use tag_repo::TagRepository;

// Re-export the operation trait so it can be used by importing TagRepository
pub use item_tag::ItemTagOperations;
pub(crate) use item_tag::{load_item_tags, replace_item_tags};
