/*!
 * # weblate-trans - translation management data layer
 *
 * A Rust library holding the data access layer of a translation management
 * system: projects, subprojects, translations and translation units stored in
 * SQLite, with a full-text index over source strings and translations.
 *
 * ## Features
 *
 * - Per-project access control filtering
 * - Importing PO and JSON translation files, including monolingual templates
 * - Unit filters by request type (fuzzy, untranslated, failing checks, ...)
 *   with cached counters
 * - Full-text search and similar-message lookup on SQLite FTS5
 * - Glossary upload and lookup
 * - Validators for subproject settings
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: Connection, schema, row models and write repository
 * - `query`: Lazily evaluated query sets
 * - `managers`: One manager per entity, wired together by `Managers`
 * - `fulltext`: Full-text index handles, text analysis and the update queue
 * - `formats`: Translation file adapters
 * - `cache`: Cache backend for computed counters
 * - `checks`: Registry of quality check names
 * - `validators`: Field validators, built on `python_format`
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod cache;
pub mod checks;
pub mod database;
pub mod errors;
pub mod formats;
pub mod fulltext;
pub mod language_utils;
pub mod managers;
pub mod python_format;
pub mod query;
pub mod util;
pub mod validators;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{DatabaseConnection, Repository, User};
pub use errors::{AppError, FormatError, LookupError, ValidationError};
pub use fulltext::FulltextIndex;
pub use language_utils::{get_language_name, language_codes_match, normalize_code};
pub use managers::{Managers, RequestType, SearchFields};
pub use query::{Condition, QuerySet};
