/*!
 * Glossary manager.
 */

use anyhow::Result;
use log::{debug, info};
use rusqlite::{params, OptionalExtension};

use crate::database::{DatabaseConnection, DictionaryRecord, LanguageRecord, ProjectRecord, UnitRecord};
use crate::formats::TranslationStore;
use crate::fulltext::terms::analyze;
use crate::query::{Condition, QuerySet};

/// Longest source or target accepted into the glossary, in characters
pub const MAX_WORD_LENGTH: usize = 200;

#[derive(Clone)]
pub struct DictionaryManager {
    db: DatabaseConnection,
}

impl DictionaryManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn all(&self) -> QuerySet<DictionaryRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Glossary of a project in one language
    pub fn for_language(&self, project_id: i64, language_id: i64) -> QuerySet<DictionaryRecord> {
        self.all()
            .filter(Condition::eq("d.project_id", project_id))
            .filter(Condition::eq("d.language_id", language_id))
    }

    /// Load glossary entries from a parsed file
    ///
    /// Only translated entries with both sides within `MAX_WORD_LENGTH`
    /// characters are taken. Existing words keep their translation unless
    /// `overwrite` is set. Returns the number of rows written.
    pub fn upload(
        &self,
        project: &ProjectRecord,
        language: &LanguageRecord,
        store: &TranslationStore,
        overwrite: bool,
    ) -> Result<usize> {
        let written = self.db.transaction(|tx| {
            let mut written = 0;

            for unit in &store.units {
                if !unit.is_translatable() || !unit.is_translated() {
                    continue;
                }

                let (source, target) = (unit.source(), unit.target());
                if source.chars().count() > MAX_WORD_LENGTH || target.chars().count() > MAX_WORD_LENGTH {
                    debug!("Skipping too long glossary entry {:?}", source);
                    continue;
                }

                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM dictionary WHERE project_id = ?1 AND language_id = ?2 AND source = ?3",
                        params![project.id, language.id, source],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    None => {
                        tx.execute(
                            "INSERT INTO dictionary (project_id, language_id, source, source_key, target) VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![project.id, language.id, source, source.to_lowercase(), target],
                        )?;
                    }
                    Some(id) if overwrite => {
                        tx.execute("UPDATE dictionary SET target = ?1 WHERE id = ?2", params![target, id])?;
                    }
                    Some(_) => continue,
                }
                written += 1;
            }

            Ok(written)
        })?;

        info!(
            "Uploaded {} glossary entries to {} ({})",
            written, project.slug, language.code
        );
        Ok(written)
    }

    /// Glossary entries whose source is one of the words of the unit's source
    ///
    /// Words are compared Unicode lowercased on both sides.
    pub fn get_words(&self, unit: &UnitRecord) -> QuerySet<DictionaryRecord> {
        let mut words = analyze(&unit.source);
        words.sort();
        words.dedup();

        self.for_language(unit.project_id, unit.language_id)
            .filter(Condition::is_in("d.source_key", words))
    }
}
