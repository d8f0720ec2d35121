//! Item Entity
//!
//! Every stored entry is an `Item` (owner, title, type, timestamps) plus exactly
//! one type-specific payload. The payload is a tagged variant selected by
//! `ItemType`; each variant maps to its own extension table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::entity::{DomainError, DomainResult, Entity};

/// Highest score a rated list entry may carry
pub const MAX_SCORE: i32 = 10;

/// Item type determines which extension table holds the item's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Bookmark,
    Note,
    Recipe,
    /// Checklist of `ListItem`s
    List,
    /// List of scored `RatedListItem`s
    RatedList,
    Media,
    Drawing,
}

impl ItemType {
    pub const ALL: [ItemType; 7] = [
        ItemType::Bookmark,
        ItemType::Note,
        ItemType::Recipe,
        ItemType::List,
        ItemType::RatedList,
        ItemType::Media,
        ItemType::Drawing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Bookmark => "bookmark",
            ItemType::Note => "note",
            ItemType::Recipe => "recipe",
            ItemType::List => "list",
            ItemType::RatedList => "rated_list",
            ItemType::Media => "media",
            ItemType::Drawing => "drawing",
        }
    }

    /// Parse the plural category names used by listing and search requests
    /// ("bookmarks", "rated-lists", ...). Singular names are accepted too.
    pub fn from_category(category: &str) -> DomainResult<Self> {
        match category.trim().to_lowercase().as_str() {
            "bookmarks" => Ok(ItemType::Bookmark),
            "notes" => Ok(ItemType::Note),
            "recipes" => Ok(ItemType::Recipe),
            "lists" | "checklists" => Ok(ItemType::List),
            "rated-lists" | "rated_lists" | "rated-list" => Ok(ItemType::RatedList),
            "drawings" => Ok(ItemType::Drawing),
            other => other.parse(),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown item type '{}'", s)))
    }
}

/// The record every item shares, regardless of type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub title: String,
    pub item_type: ItemType,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub ingredients: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
    /// Ordered by display order
    pub images: Vec<RecipeImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeImage {
    pub id: i64,
    pub file_path: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub file_path: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub file_path: String,
}

/// A checklist entry; only meaningful inside its parent list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: i64,
    pub list_id: i64,
    pub content: String,
    pub completed: bool,
}

/// A scored entry of a rated list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedListItem {
    pub id: i64,
    pub rated_list_id: i64,
    pub title: String,
    /// Always within 0..=10
    pub score: u8,
    pub note: Option<String>,
}

/// Type-specific part of an item as read back from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPayload {
    Bookmark(Bookmark),
    Note(Note),
    Recipe(Recipe),
    List(Vec<ListItem>),
    RatedList(Vec<RatedListItem>),
    Media(Media),
    Drawing(Drawing),
}

impl ItemPayload {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemPayload::Bookmark(_) => ItemType::Bookmark,
            ItemPayload::Note(_) => ItemType::Note,
            ItemPayload::Recipe(_) => ItemType::Recipe,
            ItemPayload::List(_) => ItemType::List,
            ItemPayload::RatedList(_) => ItemType::RatedList,
            ItemPayload::Media(_) => ItemType::Media,
            ItemPayload::Drawing(_) => ItemType::Drawing,
        }
    }
}

/// Read model handed to callers: the common record, its tags and its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub tags: Vec<String>,
    pub payload: ItemPayload,
}

impl ItemView {
    pub fn id(&self) -> i64 {
        self.item.id
    }

    pub fn title(&self) -> &str {
        &self.item.title
    }

    pub fn item_type(&self) -> ItemType {
        self.item.item_type
    }

    pub fn as_bookmark(&self) -> Option<&Bookmark> {
        match &self.payload {
            ItemPayload::Bookmark(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match &self.payload {
            ItemPayload::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_recipe(&self) -> Option<&Recipe> {
        match &self.payload {
            ItemPayload::Recipe(r) => Some(r),
            _ => None,
        }
    }

    pub fn list_items(&self) -> &[ListItem] {
        match &self.payload {
            ItemPayload::List(items) => items,
            _ => &[],
        }
    }

    pub fn rated_items(&self) -> &[RatedListItem] {
        match &self.payload {
            ItemPayload::RatedList(items) => items,
            _ => &[],
        }
    }
}

impl Entity for ItemView {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.item.id
    }
}

/// Recipe fields supplied at creation, images given as stored paths
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub ingredients: String,
    pub instructions: String,
    pub notes: Option<String>,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub image_paths: Vec<String>,
}

/// Checklist entry written together with its new list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewListEntry {
    pub content: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewListEntry {
    pub fn open(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            completed: false,
        }
    }
}

/// Rated entry written together with its new rated list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRatedEntry {
    pub title: String,
    /// Signed so out-of-range input reaches validation instead of failing to parse
    pub score: i32,
    pub note: Option<String>,
}

/// Type-specific fields for a new item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewPayload {
    Bookmark(Bookmark),
    Note(Note),
    Recipe(NewRecipe),
    /// Initial entries, in order; may be empty
    List(Vec<NewListEntry>),
    RatedList(Vec<NewRatedEntry>),
    Media(Media),
    Drawing(Drawing),
}

impl NewPayload {
    pub fn item_type(&self) -> ItemType {
        match self {
            NewPayload::Bookmark(_) => ItemType::Bookmark,
            NewPayload::Note(_) => ItemType::Note,
            NewPayload::Recipe(_) => ItemType::Recipe,
            NewPayload::List(_) => ItemType::List,
            NewPayload::RatedList(_) => ItemType::RatedList,
            NewPayload::Media(_) => ItemType::Media,
            NewPayload::Drawing(_) => ItemType::Drawing,
        }
    }
}

/// Everything needed to create an item in one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    /// Raw tag names; normalized on write
    #[serde(default)]
    pub tags: Vec<String>,
    pub payload: NewPayload,
}

impl NewItem {
    pub fn new(title: impl Into<String>, payload: NewPayload) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            payload,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.payload.item_type()
    }

    pub fn validate(&self) -> DomainResult<()> {
        require("title", &self.title)?;
        match &self.payload {
            NewPayload::Bookmark(b) => require("url", &b.url),
            NewPayload::Media(m) => require("file_path", &m.file_path),
            NewPayload::Drawing(d) => require("file_path", &d.file_path),
            NewPayload::Recipe(r) => r
                .image_paths
                .iter()
                .try_for_each(|p| require("image path", p)),
            NewPayload::List(entries) => entries
                .iter()
                .try_for_each(|e| require("content", &e.content)),
            NewPayload::RatedList(entries) => entries.iter().try_for_each(|e| {
                require("title", &e.title)?;
                validate_score(e.score).map(|_| ())
            }),
            NewPayload::Note(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkUpdate {
    pub url: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaUpdate {
    pub file_path: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingUpdate {
    /// `None` keeps the current image
    pub file_path: Option<String>,
}

/// Partial change to an item's extension row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadUpdate {
    Bookmark(BookmarkUpdate),
    Note(NoteUpdate),
    Recipe(RecipeUpdate),
    Media(MediaUpdate),
    Drawing(DrawingUpdate),
}

impl PayloadUpdate {
    pub fn item_type(&self) -> ItemType {
        match self {
            PayloadUpdate::Bookmark(_) => ItemType::Bookmark,
            PayloadUpdate::Note(_) => ItemType::Note,
            PayloadUpdate::Recipe(_) => ItemType::Recipe,
            PayloadUpdate::Media(_) => ItemType::Media,
            PayloadUpdate::Drawing(_) => ItemType::Drawing,
        }
    }
}

/// Partial update of an item. `None` fields are left untouched; `Some(tags)`
/// replaces the whole tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub payload: Option<PayloadUpdate>,
}

impl ItemUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Check the update against the type of the item it targets
    pub fn validate_for(&self, item_type: ItemType) -> DomainResult<()> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        let Some(payload) = &self.payload else {
            return Ok(());
        };
        if payload.item_type() != item_type {
            return Err(DomainError::validation(format!(
                "cannot apply {} fields to a {}",
                payload.item_type(),
                item_type
            )));
        }
        match payload {
            PayloadUpdate::Bookmark(b) => b.url.as_deref().map_or(Ok(()), |u| require("url", u)),
            PayloadUpdate::Media(m) => m
                .file_path
                .as_deref()
                .map_or(Ok(()), |p| require("file_path", p)),
            PayloadUpdate::Drawing(d) => d
                .file_path
                .as_deref()
                .map_or(Ok(()), |p| require("file_path", p)),
            PayloadUpdate::Note(_) | PayloadUpdate::Recipe(_) => Ok(()),
        }
    }
}

/// Reject scores outside 0..=10 instead of clamping them
pub fn validate_score(score: i32) -> DomainResult<u8> {
    if (0..=MAX_SCORE).contains(&score) {
        Ok(score as u8)
    } else {
        Err(DomainError::validation(format!(
            "score must be between 0 and {}, got {}",
            MAX_SCORE, score
        )))
    }
}

pub(crate) fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_serialization() {
        assert_eq!(ItemType::RatedList.as_str(), "rated_list");
        assert_eq!("drawing".parse::<ItemType>().unwrap(), ItemType::Drawing);
        assert!("daily".parse::<ItemType>().is_err());
        for t in ItemType::ALL {
            assert_eq!(t.as_str().parse::<ItemType>().unwrap(), t);
        }
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ItemType::from_category("rated-lists").unwrap(), ItemType::RatedList);
        assert_eq!(ItemType::from_category("Bookmarks").unwrap(), ItemType::Bookmark);
        assert_eq!(ItemType::from_category("media").unwrap(), ItemType::Media);
        assert_eq!(ItemType::from_category("note").unwrap(), ItemType::Note);
        assert!(ItemType::from_category("dashboard").is_err());
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(validate_score(7).unwrap(), 7);
        assert_eq!(validate_score(0).unwrap(), 0);
        assert_eq!(validate_score(10).unwrap(), 10);
        assert!(matches!(validate_score(15), Err(DomainError::Validation(_))));
        assert!(matches!(validate_score(-1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_new_item_requires_title_and_url() {
        let ok = NewItem::new(
            "Example",
            NewPayload::Bookmark(Bookmark {
                url: "http://example.com".into(),
                ..Bookmark::default()
            }),
        );
        assert!(ok.validate().is_ok());

        let blank_title = NewItem::new("  ", NewPayload::Note(Note::default()));
        assert!(blank_title.validate().is_err());

        let no_url = NewItem::new("Example", NewPayload::Bookmark(Bookmark::default()));
        assert!(no_url.validate().is_err());
    }

    #[test]
    fn test_new_list_entries_validated() {
        let list = NewItem::new(
            "Groceries",
            NewPayload::List(vec![NewListEntry::open("milk"), NewListEntry::open(" ")]),
        );
        assert!(matches!(list.validate(), Err(DomainError::Validation(_))));

        let rated = |score| {
            NewItem::new(
                "Films",
                NewPayload::RatedList(vec![NewRatedEntry {
                    title: "Alien".into(),
                    score,
                    note: None,
                }]),
            )
        };
        assert!(rated(9).validate().is_ok());
        assert!(matches!(rated(11).validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_update_type_mismatch() {
        let update = ItemUpdate {
            payload: Some(PayloadUpdate::Note(NoteUpdate {
                content: Some("x".into()),
            })),
            ..ItemUpdate::default()
        };
        assert!(update.validate_for(ItemType::Note).is_ok());
        assert!(update.validate_for(ItemType::Bookmark).is_err());
    }

    #[test]
    fn test_drawing_update_without_path_keeps_image() {
        let update = ItemUpdate {
            title: Some("Sketch".into()),
            payload: Some(PayloadUpdate::Drawing(DrawingUpdate::default())),
            ..ItemUpdate::default()
        };
        assert!(update.validate_for(ItemType::Drawing).is_ok());
    }
}
