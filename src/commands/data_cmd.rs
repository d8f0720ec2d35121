//! Export / Import Commands
//!
//! A user's whole collection as one JSON document. Import recreates every
//! entry for the importing user; entries that fail validation are skipped
//! and counted.

use serde::{Deserialize, Serialize};

use crate::commands::AppState;
use crate::domain::{
    Bookmark, DomainError, DomainResult, Drawing, ItemPayload, ItemType, ItemView, Media, NewItem,
    NewListEntry, NewPayload, NewRatedEntry, NewRecipe, Note,
};
use crate::repository::{ItemFilter, Repository};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedBookmark {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub bookmark: Bookmark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedNote {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRecipe {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub recipe: NewRecipe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedList {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub items: Vec<NewListEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRatedList {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub items: Vec<NewRatedEntry>,
}

/// Drawings and media; the file itself stays in file storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportBundle {
    /// Unix millis
    pub exported_at: i64,
    pub bookmarks: Vec<ExportedBookmark>,
    pub notes: Vec<ExportedNote>,
    pub drawings: Vec<ExportedFile>,
    pub lists: Vec<ExportedList>,
    pub rated_lists: Vec<ExportedRatedList>,
    pub recipes: Vec<ExportedRecipe>,
    pub media: Vec<ExportedFile>,
}

impl ExportBundle {
    pub fn to_json(&self) -> DomainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
            + self.notes.len()
            + self.drawings.len()
            + self.lists.len()
            + self.rated_lists.len()
            + self.recipes.len()
            + self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, view: ItemView) {
        let title = view.item.title;
        let tags = view.tags;
        match view.payload {
            ItemPayload::Bookmark(bookmark) => self.bookmarks.push(ExportedBookmark { title, tags, bookmark }),
            ItemPayload::Note(note) => self.notes.push(ExportedNote {
                title,
                tags,
                content: note.content,
            }),
            ItemPayload::Recipe(r) => self.recipes.push(ExportedRecipe {
                title,
                tags,
                recipe: NewRecipe {
                    ingredients: r.ingredients,
                    instructions: r.instructions,
                    notes: r.notes,
                    thumbnail: r.thumbnail,
                    source_url: r.source_url,
                    image_paths: r.images.into_iter().map(|i| i.file_path).collect(),
                },
            }),
            ItemPayload::List(entries) => self.lists.push(ExportedList {
                title,
                tags,
                items: entries
                    .into_iter()
                    .map(|e| NewListEntry {
                        content: e.content,
                        completed: e.completed,
                    })
                    .collect(),
            }),
            ItemPayload::RatedList(entries) => self.rated_lists.push(ExportedRatedList {
                title,
                tags,
                items: entries
                    .into_iter()
                    .map(|e| NewRatedEntry {
                        title: e.title,
                        score: i32::from(e.score),
                        note: e.note,
                    })
                    .collect(),
            }),
            ItemPayload::Media(m) => self.media.push(ExportedFile {
                title,
                tags,
                file_path: m.file_path,
                mime_type: m.mime_type,
            }),
            ItemPayload::Drawing(d) => self.drawings.push(ExportedFile {
                title,
                tags,
                file_path: d.file_path,
                mime_type: None,
            }),
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// One message per skipped entry
    pub errors: Vec<String>,
}

impl ImportSummary {
    /// Count a validation failure as a skip; anything else aborts the import
    fn record(&mut self, what: &str, title: &str, result: DomainResult<()>) -> DomainResult<()> {
        match result {
            Ok(()) => {
                self.imported += 1;
                Ok(())
            }
            Err(DomainError::Validation(msg)) => {
                self.skipped += 1;
                self.errors.push(format!("{} '{}': {}", what, title, msg));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Everything the user owns, oldest first within each category
pub async fn export_user_data(state: &AppState, user_id: i64) -> DomainResult<ExportBundle> {
    let mut bundle = ExportBundle {
        exported_at: chrono::Utc::now().timestamp_millis(),
        ..ExportBundle::default()
    };
    for item_type in ItemType::ALL {
        let mut views = state.items.list(user_id, &ItemFilter::of_type(item_type)).await?;
        views.reverse();
        for view in views {
            bundle.push(view);
        }
    }
    log::info!("Exported {} items for user {}", bundle.len(), user_id);
    Ok(bundle)
}

pub async fn import_user_data(state: &AppState, user_id: i64, bundle: &ExportBundle) -> DomainResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    for b in &bundle.bookmarks {
        let new = NewItem::new(&b.title, NewPayload::Bookmark(b.bookmark.clone())).with_tags(b.tags.clone());
        summary.record("bookmark", &b.title, create(state, user_id, &new).await)?;
    }
    for n in &bundle.notes {
        let note = Note {
            content: n.content.clone(),
        };
        let new = NewItem::new(&n.title, NewPayload::Note(note)).with_tags(n.tags.clone());
        summary.record("note", &n.title, create(state, user_id, &new).await)?;
    }
    for r in &bundle.recipes {
        let new = NewItem::new(&r.title, NewPayload::Recipe(r.recipe.clone())).with_tags(r.tags.clone());
        summary.record("recipe", &r.title, create(state, user_id, &new).await)?;
    }
    for d in &bundle.drawings {
        let drawing = Drawing {
            file_path: d.file_path.clone(),
        };
        let new = NewItem::new(&d.title, NewPayload::Drawing(drawing)).with_tags(d.tags.clone());
        summary.record("drawing", &d.title, create(state, user_id, &new).await)?;
    }
    for m in &bundle.media {
        let media = Media {
            file_path: m.file_path.clone(),
            mime_type: m.mime_type.clone(),
        };
        let new = NewItem::new(&m.title, NewPayload::Media(media)).with_tags(m.tags.clone());
        summary.record("media", &m.title, create(state, user_id, &new).await)?;
    }
    for l in &bundle.lists {
        summary.record("list", &l.title, import_list(state, user_id, l).await)?;
    }
    for l in &bundle.rated_lists {
        summary.record("rated list", &l.title, import_rated_list(state, user_id, l).await)?;
    }

    log::info!(
        "Import for user {}: {} imported, {} skipped",
        user_id,
        summary.imported,
        summary.skipped
    );
    Ok(summary)
}

async fn create(state: &AppState, user_id: i64, new: &NewItem) -> DomainResult<()> {
    state.items.create(user_id, new).await.map(|_| ())
}

/// One write per list, so a storage failure never leaves part of a list behind
async fn import_list(state: &AppState, user_id: i64, list: &ExportedList) -> DomainResult<()> {
    let entries = list
        .items
        .iter()
        .filter(|e| !e.content.trim().is_empty())
        .cloned()
        .collect();
    let new = NewItem::new(&list.title, NewPayload::List(entries)).with_tags(list.tags.clone());
    create(state, user_id, &new).await
}

async fn import_rated_list(state: &AppState, user_id: i64, list: &ExportedRatedList) -> DomainResult<()> {
    let new = NewItem::new(&list.title, NewPayload::RatedList(list.items.clone())).with_tags(list.tags.clone());
    create(state, user_id, &new).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{fail_list_entry, state_and_user};
    use crate::commands::{create_bookmark, create_list, create_note, create_rated_list};
    use crate::repository::{ListItemOperations, RatedListItemOperations};

    #[tokio::test]
    async fn test_export_then_import_into_another_user() {
        let (state, alice) = state_and_user(None).await;

        create_note(&state, alice, "Ideas", "write more", vec!["todo".into()]).await.unwrap();
        let bookmark = Bookmark {
            url: "https://rust.test".into(),
            ..Bookmark::default()
        };
        create_bookmark(&state, alice, "Rust", bookmark, vec![]).await.unwrap();
        let groceries = create_list(&state, alice, "Groceries", &["milk".to_string()], vec![]).await.unwrap();
        state
            .items
            .toggle_list_item(alice, groceries.list_items()[0].id)
            .await
            .unwrap();
        let films = create_rated_list(&state, alice, "Films", vec![]).await.unwrap();
        state
            .items
            .add_rated_list_item(alice, films.id(), "Alien", 9, Some("classic"))
            .await
            .unwrap();

        let json = export_user_data(&state, alice).await.unwrap().to_json().unwrap();
        let bundle = ExportBundle::from_json(&json).unwrap();
        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle.notes[0].tags, vec!["todo"]);
        assert_eq!(bundle.rated_lists[0].items[0].score, 9);

        let bob = state.users.create_user("bob", "hash").await.unwrap().id;
        let summary = import_user_data(&state, bob, &bundle).await.unwrap();
        assert_eq!(summary.imported, 4);
        assert_eq!(summary.skipped, 0);

        let lists = state.items.list(bob, &ItemFilter::of_type(ItemType::List)).await.unwrap();
        assert_eq!(lists.len(), 1);
        assert!(lists[0].list_items()[0].completed);
    }

    #[tokio::test]
    async fn test_invalid_entries_are_skipped() {
        let (state, user) = state_and_user(None).await;

        let json = r#"{
            "notes": [{ "title": "", "content": "no title" }, { "title": "Kept" }],
            "rated_lists": [{ "title": "Bad", "items": [{ "title": "x", "score": 15, "note": null }] }]
        }"#;
        let bundle = ExportBundle::from_json(json).unwrap();
        let summary = import_user_data(&state, user, &bundle).await.unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errors.len(), 2);

        let rated = state
            .items
            .list(user, &ItemFilter::of_type(ItemType::RatedList))
            .await
            .unwrap();
        assert!(rated.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_without_partial_list() {
        let (state, user) = state_and_user(None).await;
        fail_list_entry(&state, "boom").await;

        let json = r#"{
            "notes": [{ "title": "Kept" }],
            "lists": [{ "title": "Chores", "items": [{ "content": "sweep", "completed": true }, { "content": "boom" }] }]
        }"#;
        let bundle = ExportBundle::from_json(json).unwrap();
        let err = import_user_data(&state, user, &bundle).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        let lists = state.items.list(user, &ItemFilter::of_type(ItemType::List)).await.unwrap();
        assert!(lists.is_empty());
        // Items stored before the failure stay
        let notes = state.items.list(user, &ItemFilter::of_type(ItemType::Note)).await.unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ExportBundle::from_json("[1, 2"),
            Err(DomainError::Serialization(_))
        ));
    }
}
