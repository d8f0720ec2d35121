//! Tag Entity
//!
//! Tags can be attached to items for categorization and filtering.
//! Names are stored trimmed and lower-cased, so "Rust" and " rust" are one tag.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// A tag for categorizing items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Normalized tag name
    pub name: String,
}

impl Tag {
    pub fn new(id: i64, name: String) -> Self {
        Self { id, name }
    }
}

impl Entity for Tag {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Join table entry for item-tag relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTag {
    pub item_id: i64,
    pub tag_id: i64,
}

/// Usage count of a tag across one user's items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Trim and lower-case a tag name; blank names yield `None`
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Normalize a batch of names, dropping blanks and duplicates.
/// First occurrence wins.
pub fn normalize_tags<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if let Some(n) = normalize_tag_name(name.as_ref()) {
            if !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

/// Split comma-separated tag input as submitted by forms ("rust, cli,,db")
pub fn parse_tag_input(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
