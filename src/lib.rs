//! infokeep
//!
//! Core of a personal information manager: bookmarks, notes, recipes,
//! checklists, rated lists, media and drawings, all taggable and searchable.
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and SQLite implementations
//! - search: Relevance ranking over items
//! - fetch: Favicon and preview image lookup for bookmarks
//! - commands: Entry points used by the presentation and import/export layers
//! - config, logging: Ambient setup

pub mod commands;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod logging;
pub mod repository;
pub mod search;

pub use commands::AppState;
pub use config::AppConfig;
pub use domain::{DomainError, DomainResult};
pub use logging::init_logging;
