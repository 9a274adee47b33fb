/*!
 * Repository layer for database writes.
 *
 * Managers compose read queries through `QuerySet`; everything that
 * inserts or updates rows goes through the `Repository` so the SQL for
 * each table lives in one place.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{
    now_timestamp, ChangeAction, LanguageRecord, ProjectRecord, SubProjectRecord,
    TranslationRecord, UnitRecord, User,
};
use crate::language_utils::{get_language_name, normalize_code};
use crate::query::{Condition, QuerySet};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Languages
    // =========================================================================

    /// Get a language by code, creating it when unknown
    pub fn get_or_create_language(&self, code: &str) -> Result<LanguageRecord> {
        let code = normalize_code(code);
        let name = get_language_name(&code);

        self.db.execute(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO languages (code, name) VALUES (?1, ?2)",
                params![code, name],
            )?;
            let language = conn.query_row(
                "SELECT id, code, name FROM languages WHERE code = ?1",
                [&code],
                |row| {
                    Ok(LanguageRecord {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )?;
            Ok(language)
        })
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Insert a project, returning the stored record
    pub fn create_project(&self, project: &ProjectRecord) -> Result<ProjectRecord> {
        let id = self.db.execute(|conn| {
            conn.execute(
                "INSERT INTO projects (name, slug, web, enable_acl) VALUES (?1, ?2, ?3, ?4)",
                params![project.name, project.slug, project.web, project.enable_acl],
            )
            .with_context(|| format!("Failed to create project {}", project.slug))?;
            Ok(conn.last_insert_rowid())
        })?;

        info!("Created project {}", project.slug);
        Ok(ProjectRecord {
            id,
            ..project.clone()
        })
    }

    /// Insert a subproject, returning the stored record
    pub fn create_subproject(&self, subproject: &SubProjectRecord) -> Result<SubProjectRecord> {
        let id = self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO subprojects (
                    project_id, name, slug, repo, repoweb, branch,
                    filemask, template, commit_message
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    subproject.project_id,
                    subproject.name,
                    subproject.slug,
                    subproject.repo,
                    subproject.repoweb,
                    subproject.branch,
                    subproject.filemask,
                    subproject.template,
                    subproject.commit_message,
                ],
            )
            .with_context(|| format!("Failed to create subproject {}", subproject.full_slug()))?;
            Ok(conn.last_insert_rowid())
        })?;

        info!("Created subproject {}", subproject.full_slug());
        Ok(SubProjectRecord {
            id,
            ..subproject.clone()
        })
    }

    // =========================================================================
    // Translations
    // =========================================================================

    /// Load a translation by ID
    pub fn get_translation(&self, translation_id: i64) -> Result<TranslationRecord> {
        Ok(QuerySet::<TranslationRecord>::all(self.db.clone())
            .filter(Condition::eq("t.id", translation_id))
            .get()?)
    }

    /// Get the translation of a subproject into a language, creating it if needed
    ///
    /// Returns the record and whether it was created.
    pub fn get_or_create_translation(
        &self,
        subproject: &SubProjectRecord,
        language: &LanguageRecord,
    ) -> Result<(TranslationRecord, bool)> {
        let (id, created) = self.db.execute(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM translations WHERE subproject_id = ?1 AND language_id = ?2",
                    params![subproject.id, language.id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(id) = existing {
                return Ok((id, false));
            }

            conn.execute(
                "INSERT INTO translations (subproject_id, language_id, language_code) VALUES (?1, ?2, ?3)",
                params![subproject.id, language.id, language.code],
            )?;
            Ok((conn.last_insert_rowid(), true))
        })?;

        if created {
            debug!(
                "Created translation {} of {}",
                language.code,
                subproject.full_slug()
            );
        }
        Ok((self.get_translation(id)?, created))
    }

    /// Store the file name and imported revision of a translation
    pub fn set_translation_file(&self, translation_id: i64, filename: &str, revision: &str) -> Result<()> {
        self.db.execute(|conn| {
            conn.execute(
                "UPDATE translations SET filename = ?1, revision = ?2 WHERE id = ?3",
                params![filename, revision, translation_id],
            )?;
            Ok(())
        })
    }

    /// Enable or disable a translation
    pub fn set_translation_enabled(&self, translation_id: i64, enabled: bool) -> Result<()> {
        self.db.execute(|conn| {
            conn.execute(
                "UPDATE translations SET enabled = ?1 WHERE id = ?2",
                params![enabled, translation_id],
            )?;
            Ok(())
        })
    }

    /// Recompute the aggregate counters of a translation from its units
    pub fn update_translation_stats(&self, translation_id: i64) -> Result<TranslationRecord> {
        self.db.execute(|conn| {
            conn.execute(
                r#"
                UPDATE translations SET
                    total = (SELECT COUNT(*) FROM units WHERE translation_id = ?1),
                    fuzzy = (SELECT COUNT(*) FROM units WHERE translation_id = ?1 AND fuzzy = 1),
                    translated = (SELECT COUNT(*) FROM units WHERE translation_id = ?1 AND translated = 1)
                WHERE id = ?1
                "#,
                [translation_id],
            )?;
            Ok(())
        })?;

        self.get_translation(translation_id)
    }

    // =========================================================================
    // Units
    // =========================================================================

    /// Insert or update a unit; assigns the ID of new rows
    pub fn save_unit(&self, unit: &mut UnitRecord) -> Result<()> {
        let id = self.db.execute(|conn| {
            match unit.id {
                Some(id) => {
                    conn.execute(
                        r#"
                        UPDATE units SET
                            checksum = ?1, location = ?2, context = ?3, comment = ?4,
                            flags = ?5, source = ?6, previous_source = ?7, target = ?8,
                            position = ?9, fuzzy = ?10, translated = ?11
                        WHERE id = ?12
                        "#,
                        params![
                            unit.checksum,
                            unit.location,
                            unit.context,
                            unit.comment,
                            unit.flags,
                            unit.source,
                            unit.previous_source,
                            unit.target,
                            unit.position,
                            unit.fuzzy,
                            unit.translated,
                            id,
                        ],
                    )?;
                    Ok(id)
                }
                None => {
                    conn.execute(
                        r#"
                        INSERT INTO units (
                            translation_id, checksum, location, context, comment, flags,
                            source, previous_source, target, position, fuzzy, translated
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                        "#,
                        params![
                            unit.translation_id,
                            unit.checksum,
                            unit.location,
                            unit.context,
                            unit.comment,
                            unit.flags,
                            unit.source,
                            unit.previous_source,
                            unit.target,
                            unit.position,
                            unit.fuzzy,
                            unit.translated,
                        ],
                    )?;
                    Ok(conn.last_insert_rowid())
                }
            }
        })?;

        unit.id = Some(id);
        Ok(())
    }

    // =========================================================================
    // Auxiliary records keyed by checksum
    // =========================================================================

    /// Store a suggested translation for a unit
    pub fn add_suggestion(&self, unit: &UnitRecord, target: &str, user: &User) -> Result<i64> {
        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO suggestions (checksum, project_id, language_id, target, username, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    unit.checksum,
                    unit.project_id,
                    unit.language_id,
                    target,
                    user.username,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Store a comment; source comments are shared by all languages
    pub fn add_comment(&self, unit: &UnitRecord, comment: &str, user: &User, source: bool) -> Result<i64> {
        let language_id = (!source).then_some(unit.language_id);

        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO comments (checksum, project_id, language_id, comment, username, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    unit.checksum,
                    unit.project_id,
                    language_id,
                    comment,
                    user.username,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Store a failing check result; source checks are shared by all languages
    pub fn add_check(&self, unit: &UnitRecord, check: &str, source: bool, ignored: bool) -> Result<i64> {
        let language_id = (!source).then_some(unit.language_id);

        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO checks (checksum, project_id, language_id, check_name, ignored)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![unit.checksum, unit.project_id, language_id, check, ignored],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Append an entry to the change history
    pub fn record_change(
        &self,
        translation_id: i64,
        unit: Option<&UnitRecord>,
        user: &User,
        action: ChangeAction,
    ) -> Result<i64> {
        let unit_id = unit.and_then(|u| u.id);
        let target = unit.map(|u| u.target.as_str()).unwrap_or("");

        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO changes (unit_id, translation_id, username, action, target, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    unit_id,
                    translation_id,
                    user.username,
                    action.code(),
                    target,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}
