//! Search Commands
//!
//! Per-category search and the dashboard search across categories.

use serde::{Deserialize, Serialize};

use crate::commands::AppState;
use crate::domain::{DomainResult, ItemType, ItemView};
use crate::repository::{ItemFilter, Repository, SearchableRepository};
use crate::search::{fields_for, rank_scored, Scored};

/// Categories the dashboard searches, in display order. Media is left out.
pub const DASHBOARD_CATEGORIES: [ItemType; 6] = [
    ItemType::Bookmark,
    ItemType::Note,
    ItemType::Recipe,
    ItemType::List,
    ItemType::RatedList,
    ItemType::Drawing,
];

/// Ranked hits of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchGroup {
    pub item_type: ItemType,
    pub items: Vec<ItemView>,
    /// Score of each entry of `items`, same order
    pub scores: Vec<u32>,
}

/// Search one category. A blank query lists the whole category.
pub async fn search(
    state: &AppState,
    user_id: i64,
    category: &str,
    query: &str,
) -> DomainResult<Vec<ItemView>> {
    let item_type = ItemType::from_category(category)?;
    state
        .items
        .search(user_id, &ItemFilter::of_type(item_type), query)
        .await
}

/// Search every dashboard category. Categories without hits are omitted and
/// a blank query finds nothing.
pub async fn search_dashboard(state: &AppState, user_id: i64, query: &str) -> DomainResult<Vec<SearchGroup>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = Vec::new();
    for item_type in DASHBOARD_CATEGORIES {
        let candidates = state.items.list(user_id, &ItemFilter::of_type(item_type)).await?;
        let hits = rank_scored(candidates, query, fields_for(item_type));
        if hits.is_empty() {
            continue;
        }
        let (items, scores): (Vec<ItemView>, Vec<u32>) = hits
            .into_iter()
            .map(|Scored { item, score }| (item, score))
            .unzip();
        groups.push(SearchGroup {
            item_type,
            items,
            scores,
        });
    }

    log::debug!("Dashboard search for user {} matched {} categories", user_id, groups.len());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::state_and_user;
    use crate::commands::{create_media, create_note, create_recipe};
    use crate::domain::{DomainError, NewRecipe};

    #[tokio::test]
    async fn test_recipe_title_outranks_ingredient_match() {
        let (state, user) = state_and_user(None).await;

        let cake = NewRecipe {
            ingredients: "flour, cocoa".into(),
            instructions: "bake".into(),
            ..NewRecipe::default()
        };
        let cookies = NewRecipe {
            ingredients: "flour, chocolate chips".into(),
            instructions: "bake".into(),
            ..NewRecipe::default()
        };
        create_recipe(&state, user, "Chocolate Cake", cake, vec![]).await.unwrap();
        create_recipe(&state, user, "Cookies", cookies, vec![]).await.unwrap();

        let hits = search(&state, user, "recipes", "choc").await.unwrap();
        let titles: Vec<_> = hits.iter().map(|v| v.title()).collect();
        assert_eq!(titles, vec!["Chocolate Cake", "Cookies"]);

        assert_eq!(search(&state, user, "recipes", "").await.unwrap().len(), 2);
        assert!(matches!(
            search(&state, user, "widgets", "x").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_groups_and_skips_media() {
        let (state, user) = state_and_user(None).await;

        create_note(&state, user, "Garden plan", "tomatoes", vec![]).await.unwrap();
        create_recipe(&state, user, "Tomato soup", NewRecipe::default(), vec![]).await.unwrap();
        create_media(&state, user, Some("tomato.jpg"), "uploads/tomato.jpg", None, vec![])
            .await
            .unwrap();

        let groups = search_dashboard(&state, user, "tomato").await.unwrap();
        let types: Vec<_> = groups.iter().map(|g| g.item_type).collect();
        assert_eq!(types, vec![ItemType::Note, ItemType::Recipe]);
        // title prefix 10 * 2, content prefix 5 * 2
        assert_eq!(groups[1].scores, vec![20]);
        assert_eq!(groups[0].scores, vec![10]);

        assert!(search_dashboard(&state, user, "   ").await.unwrap().is_empty());
    }
}
