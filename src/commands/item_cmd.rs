//! Item Commands
//!
//! Create, read, update and delete for every item type.

use std::path::Path;

use crate::commands::AppState;
use crate::domain::{
    Bookmark, DomainResult, Drawing, ItemType, ItemUpdate, ItemView, Media, NewItem, NewListEntry,
    NewPayload, NewRecipe, Note,
};
use crate::fetch::{favicon_url, fetch_thumbnail};
use crate::repository::{ItemFilter, Repository};

async fn create_and_load(state: &AppState, user_id: i64, new: NewItem) -> DomainResult<ItemView> {
    let id = state.items.create(user_id, &new).await?;
    state.items.get(user_id, id).await
}

/// Create a bookmark. A missing favicon or thumbnail is derived from the URL;
/// an unreachable page still saves the bookmark.
pub async fn create_bookmark(
    state: &AppState,
    user_id: i64,
    title: &str,
    mut bookmark: Bookmark,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    bookmark.url = bookmark.url.trim().to_string();
    if bookmark.favicon.is_none() {
        bookmark.favicon = favicon_url(&bookmark.url);
    }
    if bookmark.thumbnail.is_none() && state.config.fetch_thumbnails && !bookmark.url.is_empty() {
        bookmark.thumbnail = fetch_thumbnail(state.fetcher.as_ref(), &bookmark.url).await;
    }

    let new = NewItem::new(title, NewPayload::Bookmark(bookmark)).with_tags(tags);
    create_and_load(state, user_id, new).await
}

pub async fn create_note(
    state: &AppState,
    user_id: i64,
    title: &str,
    content: &str,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    let note = Note {
        content: content.to_string(),
    };
    create_and_load(state, user_id, NewItem::new(title, NewPayload::Note(note)).with_tags(tags)).await
}

pub async fn create_recipe(
    state: &AppState,
    user_id: i64,
    title: &str,
    recipe: NewRecipe,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    create_and_load(state, user_id, NewItem::new(title, NewPayload::Recipe(recipe)).with_tags(tags)).await
}

/// Create a checklist holding `entries` in order. Blank entries are skipped.
/// The list and its entries are stored together or not at all.
pub async fn create_list(
    state: &AppState,
    user_id: i64,
    title: &str,
    entries: &[String],
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    let entries = entries
        .iter()
        .filter(|e| !e.trim().is_empty())
        .map(|e| NewListEntry::open(e.as_str()))
        .collect();
    create_and_load(state, user_id, NewItem::new(title, NewPayload::List(entries)).with_tags(tags)).await
}

pub async fn create_rated_list(
    state: &AppState,
    user_id: i64,
    title: &str,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    create_and_load(state, user_id, NewItem::new(title, NewPayload::RatedList(Vec::new())).with_tags(tags)).await
}

/// Register an uploaded file. The title falls back to the file name and the
/// MIME type is guessed from the extension when the upload did not carry one.
pub async fn create_media(
    state: &AppState,
    user_id: i64,
    title: Option<&str>,
    file_path: &str,
    mime_type: Option<String>,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| file_name(file_path));
    let mime_type = mime_type
        .filter(|m| !m.trim().is_empty())
        .or_else(|| Some(guess_mime(file_path)));

    let media = Media {
        file_path: file_path.trim().to_string(),
        mime_type,
    };
    create_and_load(state, user_id, NewItem::new(title, NewPayload::Media(media)).with_tags(tags)).await
}

pub async fn create_drawing(
    state: &AppState,
    user_id: i64,
    title: &str,
    file_path: &str,
    tags: Vec<String>,
) -> DomainResult<ItemView> {
    let drawing = Drawing {
        file_path: file_path.trim().to_string(),
    };
    create_and_load(state, user_id, NewItem::new(title, NewPayload::Drawing(drawing)).with_tags(tags)).await
}

pub async fn get_item(state: &AppState, user_id: i64, id: i64) -> DomainResult<ItemView> {
    state.items.get(user_id, id).await
}

/// Items of one category, newest first, optionally narrowed to a tag
pub async fn list_items(
    state: &AppState,
    user_id: i64,
    category: &str,
    tag: Option<&str>,
) -> DomainResult<Vec<ItemView>> {
    let item_type = ItemType::from_category(category)?;
    let filter = match tag.filter(|t| !t.trim().is_empty()) {
        Some(tag) => ItemFilter::tagged(item_type, tag),
        None => ItemFilter::of_type(item_type),
    };
    state.items.list(user_id, &filter).await
}

pub async fn update_item(
    state: &AppState,
    user_id: i64,
    id: i64,
    changes: ItemUpdate,
) -> DomainResult<ItemView> {
    state.items.update(user_id, id, &changes).await
}

pub async fn delete_item(state: &AppState, user_id: i64, id: i64) -> DomainResult<()> {
    state.items.delete(user_id, id).await
}

fn file_name(file_path: &str) -> String {
    Path::new(file_path.trim())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.trim().to_string())
}

fn guess_mime(file_path: &str) -> String {
    mime_guess::from_path(file_path.trim())
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{fail_list_entry, state_and_user};
    use crate::domain::{DomainError, DrawingUpdate, PayloadUpdate};

    const PAGE: &str = r#"<html><head><meta property="og:image" content="https://cdn.test/cover.png"></head></html>"#;

    fn bookmark(url: &str) -> Bookmark {
        Bookmark {
            url: url.to_string(),
            description: None,
            favicon: None,
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_bookmark_derives_favicon_and_thumbnail() {
        let (state, user) = state_and_user(Some(PAGE)).await;

        let view = create_bookmark(&state, user, "Docs", bookmark("https://docs.test/intro"), vec![])
            .await
            .unwrap();
        let b = view.as_bookmark().unwrap();
        assert_eq!(b.favicon.as_deref(), Some("https://docs.test/favicon.ico"));
        assert_eq!(b.thumbnail.as_deref(), Some("https://cdn.test/cover.png"));
    }

    #[tokio::test]
    async fn test_bookmark_saved_when_fetch_fails() {
        let (state, user) = state_and_user(None).await;

        let view = create_bookmark(&state, user, "Slow", bookmark("https://slow.test"), vec!["Tech".into()])
            .await
            .unwrap();
        let b = view.as_bookmark().unwrap();
        assert_eq!(b.thumbnail, None);
        assert_eq!(b.favicon.as_deref(), Some("https://slow.test/favicon.ico"));
        assert_eq!(view.tags, vec!["tech"]);
    }

    #[tokio::test]
    async fn test_bookmark_requires_url() {
        let (state, user) = state_and_user(None).await;
        let err = create_bookmark(&state, user, "Nothing", bookmark("  "), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_media_defaults() {
        let (state, user) = state_and_user(None).await;

        let view = create_media(&state, user, None, "uploads/7/holiday.png", None, vec![])
            .await
            .unwrap();
        assert_eq!(view.title(), "holiday.png");
        match &view.payload {
            crate::domain::ItemPayload::Media(m) => assert_eq!(m.mime_type.as_deref(), Some("image/png")),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_with_entries_and_category_listing() {
        let (state, user) = state_and_user(None).await;

        let entries = vec!["milk".to_string(), " ".to_string(), "eggs".to_string()];
        let list = create_list(&state, user, "Groceries", &entries, vec![]).await.unwrap();
        let contents: Vec<_> = list.list_items().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["milk", "eggs"]);

        let lists = list_items(&state, user, "checklists", None).await.unwrap();
        assert_eq!(lists.len(), 1);
        assert!(list_items(&state, user, "spaceships", None).await.is_err());
    }

    #[tokio::test]
    async fn test_list_not_kept_when_an_entry_fails_to_store() {
        let (state, user) = state_and_user(None).await;
        fail_list_entry(&state, "boom").await;

        let entries = vec!["milk".to_string(), "boom".to_string()];
        let err = create_list(&state, user, "Groceries", &entries, vec!["food".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        assert!(list_items(&state, user, "lists", None).await.unwrap().is_empty());
        assert!(state.tags.all_tag_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drawing_partial_update_keeps_file() {
        let (state, user) = state_and_user(None).await;
        let drawing = create_drawing(&state, user, "Sketch", "drawings/a.png", vec![]).await.unwrap();

        let changes = ItemUpdate {
            title: Some("Sketch v2".into()),
            payload: Some(PayloadUpdate::Drawing(DrawingUpdate { file_path: None })),
            ..ItemUpdate::default()
        };
        let updated = update_item(&state, user, drawing.id(), changes).await.unwrap();
        assert_eq!(updated.title(), "Sketch v2");
        assert_eq!(
            updated.payload,
            crate::domain::ItemPayload::Drawing(Drawing {
                file_path: "drawings/a.png".into()
            })
        );

        delete_item(&state, user, drawing.id()).await.unwrap();
        assert!(matches!(
            get_item(&state, user, drawing.id()).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
