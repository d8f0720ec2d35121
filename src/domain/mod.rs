//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer does no I/O.

mod entity;
mod item;
mod tag;
mod user;

pub use entity::{Entity, DomainError, DomainResult};
pub use item::{
    validate_score, Bookmark, BookmarkUpdate, Drawing, DrawingUpdate, Item, ItemPayload,
    ItemType, ItemUpdate, ItemView, ListItem, Media, MediaUpdate, NewItem, NewPayload,
    NewListEntry, NewRatedEntry, NewRecipe, Note, NoteUpdate, PayloadUpdate, RatedListItem,
    Recipe, RecipeImage, RecipeUpdate, MAX_SCORE,
};
pub(crate) use item::require;
pub use tag::{normalize_tag_name, normalize_tags, parse_tag_input, ItemTag, Tag, TagCount};
pub use user::{Session, User};
