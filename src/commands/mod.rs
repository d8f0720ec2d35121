//! Commands Layer
//!
//! Entry points used by the presentation, import and export collaborators.
//! Every call takes the user id resolved by the auth layer and goes through
//! the repositories, so ownership checks always apply.

mod data_cmd;
mod item_cmd;
mod search_cmd;
mod tag_cmd;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::DomainResult;
use crate::fetch::{HttpPageFetcher, PageFetcher};
use crate::repository::{init_db, DbState, ItemRepository, TagRepository, UserRepository};

pub use data_cmd::*;
pub use item_cmd::*;
pub use search_cmd::*;
pub use tag_cmd::*;

/// Application state shared across commands
pub struct AppState {
    pub db_state: DbState,
    pub items: ItemRepository,
    pub tags: TagRepository,
    pub users: UserRepository,
    pub fetcher: Arc<dyn PageFetcher>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the configured database and wire the repositories to it
    pub async fn open(config: AppConfig) -> DomainResult<Self> {
        let fetcher = Arc::new(HttpPageFetcher::from_config(&config)?);
        Self::open_with_fetcher(config, fetcher).await
    }

    pub async fn open_with_fetcher(config: AppConfig, fetcher: Arc<dyn PageFetcher>) -> DomainResult<Self> {
        let db_state = init_db(&config.db_path).await?;
        let handle = db_state.handle();
        Ok(Self {
            items: ItemRepository::new(handle.clone()),
            tags: TagRepository::new(handle.clone()),
            users: UserRepository::new(handle),
            db_state,
            fetcher,
            config,
        })
    }

    /// Close the database. Later calls fail with a storage error.
    pub async fn close(&self) -> DomainResult<()> {
        self.db_state.close().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::Arc;

    use super::AppState;
    use crate::config::AppConfig;
    use crate::domain::{DomainError, DomainResult};
    use crate::fetch::PageFetcher;

    /// Serves one fixed page, or fails every request when `html` is `None`
    pub struct StubFetcher {
        pub html: Option<&'static str>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch_page(&self, url: &str) -> DomainResult<String> {
            self.html
                .map(str::to_string)
                .ok_or_else(|| DomainError::ExternalFetch(format!("{} unreachable", url)))
        }
    }

    pub async fn state_with_page(html: Option<&'static str>) -> AppState {
        AppState::open_with_fetcher(AppConfig::in_memory(), Arc::new(StubFetcher { html }))
            .await
            .unwrap()
    }

    /// Make every insert of a checklist entry with `content` abort, as a
    /// failing disk would
    pub async fn fail_list_entry(state: &AppState, content: &str) {
        let guard = state.db_state.conn.lock().await;
        guard
            .as_ref()
            .unwrap()
            .execute_batch(&format!(
                "CREATE TRIGGER fail_entry BEFORE INSERT ON list_items WHEN NEW.content = '{}'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
                content
            ))
            .unwrap();
    }

    /// In-memory state plus a registered user; returns the user id
    pub async fn state_and_user(html: Option<&'static str>) -> (AppState, i64) {
        let state = state_with_page(html).await;
        let user = state.users.create_user("alice", "hash").await.unwrap();
        (state, user.id)
    }
}
