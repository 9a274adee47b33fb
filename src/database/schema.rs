/*!
 * Relational schema of the translation store.
 *
 * Auxiliary records (suggestions, comments, checks) are keyed by unit
 * checksum and scoped by project and language, so they survive units being
 * deleted and recreated on import. A NULL `language_id` marks a record
 * about the source string.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create the tables of a fresh database, refuse unknown versions
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version != SCHEMA_VERSION {
        return Err(anyhow!(
            "Database schema v{} is not supported, expected v{}",
            current_version,
            SCHEMA_VERSION
        ));
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    // Foreign keys are a per-connection setting
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    Ok(())
}

/// Stored schema version, 0 for an empty database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL mode for concurrent readers; in-memory databases ignore it
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .context("Failed to enable WAL mode")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS languages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            web TEXT NOT NULL DEFAULT '',
            enable_acl INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS subprojects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            repo TEXT NOT NULL DEFAULT '',
            repoweb TEXT NOT NULL DEFAULT '',
            branch TEXT NOT NULL DEFAULT 'master',
            filemask TEXT NOT NULL,
            template TEXT NOT NULL DEFAULT '',
            commit_message TEXT NOT NULL DEFAULT '',
            UNIQUE(project_id, slug)
        );

        CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subproject_id INTEGER NOT NULL REFERENCES subprojects(id) ON DELETE CASCADE,
            language_id INTEGER NOT NULL REFERENCES languages(id),
            language_code TEXT NOT NULL,
            filename TEXT NOT NULL DEFAULT '',
            revision TEXT NOT NULL DEFAULT '',
            enabled INTEGER NOT NULL DEFAULT 1,
            total INTEGER NOT NULL DEFAULT 0,
            fuzzy INTEGER NOT NULL DEFAULT 0,
            translated INTEGER NOT NULL DEFAULT 0,
            UNIQUE(subproject_id, language_id)
        );

        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            translation_id INTEGER NOT NULL REFERENCES translations(id) ON DELETE CASCADE,
            checksum TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            context TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            flags TEXT NOT NULL DEFAULT '',
            source TEXT NOT NULL,
            previous_source TEXT NOT NULL DEFAULT '',
            target TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL DEFAULT 0,
            fuzzy INTEGER NOT NULL DEFAULT 0,
            translated INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_units_translation_checksum ON units(translation_id, checksum);
        CREATE INDEX IF NOT EXISTS idx_units_checksum ON units(checksum);

        CREATE TABLE IF NOT EXISTS suggestions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            checksum TEXT NOT NULL,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            language_id INTEGER NOT NULL REFERENCES languages(id),
            target TEXT NOT NULL,
            username TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_suggestions_scope ON suggestions(project_id, language_id);

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            checksum TEXT NOT NULL,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            language_id INTEGER REFERENCES languages(id),
            comment TEXT NOT NULL,
            username TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_scope ON comments(project_id, language_id);

        CREATE TABLE IF NOT EXISTS checks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            checksum TEXT NOT NULL,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            language_id INTEGER REFERENCES languages(id),
            check_name TEXT NOT NULL,
            ignored INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_checks_scope ON checks(project_id, language_id, check_name);

        CREATE TABLE IF NOT EXISTS changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER REFERENCES units(id) ON DELETE SET NULL,
            translation_id INTEGER NOT NULL REFERENCES translations(id) ON DELETE CASCADE,
            username TEXT,
            action INTEGER NOT NULL,
            target TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_changes_translation ON changes(translation_id, timestamp);

        CREATE TABLE IF NOT EXISTS dictionary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            language_id INTEGER NOT NULL REFERENCES languages(id),
            source TEXT NOT NULL,
            -- Unicode lowercase of source, SQLite lower() only folds ASCII
            source_key TEXT NOT NULL,
            target TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_dictionary_lookup ON dictionary(project_id, language_id, source);
        CREATE INDEX IF NOT EXISTS idx_dictionary_key ON dictionary(project_id, language_id, source_key);

        CREATE TABLE IF NOT EXISTS index_updates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            source INTEGER NOT NULL DEFAULT 1,
            UNIQUE(unit_id, source)
        );
        "#,
    )?;

    Ok(())
}
