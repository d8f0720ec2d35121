//! Tag Commands
//!
//! Sidebar counts and autocomplete over the tag vocabulary.

use crate::commands::AppState;
use crate::domain::{DomainResult, TagCount};

pub use crate::domain::parse_tag_input;

/// Tags the user applied, with usage counts, most used first
pub async fn sidebar_tags(state: &AppState, user_id: i64) -> DomainResult<Vec<TagCount>> {
    state.tags.tag_counts_for_user(user_id).await
}

/// Autocomplete candidates for a partially typed tag
pub async fn tag_suggestions(state: &AppState, partial: &str) -> DomainResult<Vec<String>> {
    state.tags.suggest(partial).await
}

pub async fn all_tags(state: &AppState) -> DomainResult<Vec<String>> {
    state.tags.all_tag_names().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::state_and_user;
    use crate::commands::{create_note, delete_item};

    #[tokio::test]
    async fn test_sidebar_counts_follow_deletes() {
        let (state, user) = state_and_user(None).await;

        let a = create_note(&state, user, "A", "", parse_tag_input("Rust, web")).await.unwrap();
        create_note(&state, user, "B", "", parse_tag_input("rust,,")).await.unwrap();

        let counts = sidebar_tags(&state, user).await.unwrap();
        assert_eq!(
            counts,
            vec![
                TagCount { name: "rust".into(), count: 2 },
                TagCount { name: "web".into(), count: 1 },
            ]
        );

        delete_item(&state, user, a.id()).await.unwrap();
        let counts = sidebar_tags(&state, user).await.unwrap();
        assert_eq!(counts, vec![TagCount { name: "rust".into(), count: 1 }]);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let (state, user) = state_and_user(None).await;
        create_note(&state, user, "A", "", vec!["Cooking".into(), "books".into(), "tech".into()])
            .await
            .unwrap();

        assert_eq!(tag_suggestions(&state, "OO").await.unwrap(), vec!["books", "cooking"]);
        assert_eq!(all_tags(&state).await.unwrap(), vec!["books", "cooking", "tech"]);
    }
}
