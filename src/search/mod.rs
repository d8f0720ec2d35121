//! Relevance Search
//!
//! Ranks a category's candidate items against a free-text query. Matching is
//! case-insensitive substring matching over a fixed set of fields per item
//! type, plus the item's tags:
//!
//! | match                     | weight |
//! |---------------------------|--------|
//! | title contains query      | 10     |
//! | other field contains it   | 5      |
//! | tag contains query        | 15     |
//!
//! Each weight doubles when the query is a prefix of the matched text.
//! Items scoring zero are dropped; the rest are sorted by score, highest first.
//! The sort is stable, so equal scores keep candidate order (newest first when
//! the candidates come from a repository listing).

use crate::domain::{ItemType, ItemView};

pub const TITLE_WEIGHT: u32 = 10;
pub const FIELD_WEIGHT: u32 = 5;
pub const TAG_WEIGHT: u32 = 15;
/// Multiplier when the query starts the matched text
pub const PREFIX_BONUS: u32 = 2;

/// A text field the engine may look at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Url,
    Description,
    Content,
    Ingredients,
    Instructions,
}

impl SearchField {
    pub fn weight(self) -> u32 {
        match self {
            SearchField::Title => TITLE_WEIGHT,
            _ => FIELD_WEIGHT,
        }
    }
}

/// Fields searched for each item type
pub fn fields_for(item_type: ItemType) -> &'static [SearchField] {
    match item_type {
        ItemType::Bookmark => &[SearchField::Title, SearchField::Url, SearchField::Description],
        ItemType::Note => &[SearchField::Title, SearchField::Content],
        ItemType::Recipe => &[
            SearchField::Title,
            SearchField::Ingredients,
            SearchField::Instructions,
        ],
        ItemType::List | ItemType::RatedList | ItemType::Media | ItemType::Drawing => {
            &[SearchField::Title]
        }
    }
}

/// Anything the engine can score
pub trait Searchable {
    /// Text of a field, `None` when the entity has no such field
    fn field_text(&self, field: SearchField) -> Option<&str>;

    fn tag_names(&self) -> &[String];
}

impl Searchable for ItemView {
    fn field_text(&self, field: SearchField) -> Option<&str> {
        match field {
            SearchField::Title => Some(self.title()),
            SearchField::Url => self.as_bookmark().map(|b| b.url.as_str()),
            SearchField::Description => self.as_bookmark().and_then(|b| b.description.as_deref()),
            SearchField::Content => self.as_note().map(|n| n.content.as_str()),
            SearchField::Ingredients => self.as_recipe().map(|r| r.ingredients.as_str()),
            SearchField::Instructions => self.as_recipe().map(|r| r.instructions.as_str()),
        }
    }

    fn tag_names(&self) -> &[String] {
        &self.tags
    }
}

/// A candidate with its computed score
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: u32,
}

fn match_weight(text: &str, query: &str, base: u32) -> u32 {
    let text = text.to_lowercase();
    if !text.contains(query) {
        0
    } else if text.starts_with(query) {
        base * PREFIX_BONUS
    } else {
        base
    }
}

/// Lower-cased, with surrounding whitespace removed. Inner spaces are kept.
fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Score one candidate. `query` must already be lower-cased and non-empty.
fn score_normalized<T: Searchable>(item: &T, query: &str, fields: &[SearchField]) -> u32 {
    let field_score: u32 = fields
        .iter()
        .filter_map(|&field| item.field_text(field).map(|text| match_weight(text, query, field.weight())))
        .sum();
    let tag_score: u32 = item
        .tag_names()
        .iter()
        .map(|tag| match_weight(tag, query, TAG_WEIGHT))
        .sum();
    field_score + tag_score
}

/// Score one candidate against a raw query. Blank queries score zero.
pub fn score<T: Searchable>(item: &T, query: &str, fields: &[SearchField]) -> u32 {
    let query = normalize_query(query);
    if query.is_empty() {
        return 0;
    }
    score_normalized(item, &query, fields)
}

/// Filter and order candidates with their scores.
/// A blank query returns every candidate, in order, with score 0.
pub fn rank_scored<T: Searchable>(candidates: Vec<T>, query: &str, fields: &[SearchField]) -> Vec<Scored<T>> {
    let query = normalize_query(query);
    if query.is_empty() {
        return candidates
            .into_iter()
            .map(|item| Scored { item, score: 0 })
            .collect();
    }

    let mut scored: Vec<Scored<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let score = score_normalized(&item, &query, fields);
            (score > 0).then_some(Scored { item, score })
        })
        .collect();

    // sort_by is stable: ties keep candidate order
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Filter and order candidates. A blank query returns them untouched.
pub fn rank<T: Searchable>(candidates: Vec<T>, query: &str, fields: &[SearchField]) -> Vec<T> {
    if normalize_query(query).is_empty() {
        return candidates;
    }
    rank_scored(candidates, query, fields)
        .into_iter()
        .map(|s| s.item)
        .collect()
}
