/*!
 * Database module for the relational translation store.
 *
 * This module provides SQLite-based persistence for:
 * - Projects, subprojects, languages and translations
 * - Translation units keyed by checksum
 * - Suggestions, comments, checks and change history
 * - Glossary entries and the pending index-update queue
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{
    ChangeAction, ChangeRecord, DictionaryRecord, LanguageRecord, ProjectRecord,
    SubProjectRecord, TranslationRecord, UnitRecord, User,
};
pub use repository::Repository;
