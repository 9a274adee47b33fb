/*!
 * Translation manager: access control, enabled translations and importing
 * translation files from a repository checkout.
 */

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::database::{DatabaseConnection, Repository, SubProjectRecord, TranslationRecord, User};
use crate::errors::LookupError;
use crate::formats::{load_store, TranslatableUnit, UntranslatedUnit};
use crate::language_utils::normalize_code;
use crate::query::{Condition, QuerySet};
use crate::util::hash_content;

use super::unit::SyncOutcome;
use super::{ProjectManager, UnitManager};

/// Outcome of importing one translation file
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub translation: TranslationRecord,
    /// File was unchanged and not parsed again
    pub skipped: bool,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[derive(Clone)]
pub struct TranslationManager {
    db: DatabaseConnection,
    projects: ProjectManager,
    repository: Repository,
    units: UnitManager,
}

impl TranslationManager {
    pub fn new(db: DatabaseConnection, units: UnitManager) -> Self {
        Self {
            projects: ProjectManager::new(db.clone()),
            repository: Repository::new(db.clone()),
            db,
            units,
        }
    }

    pub fn all(&self) -> QuerySet<TranslationRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Translations that are not disabled
    pub fn enabled(&self) -> QuerySet<TranslationRecord> {
        self.all().filter(Condition::eq("t.enabled", true))
    }

    /// Translations in projects the user is allowed to access
    pub fn all_acl(&self, user: &User) -> Result<QuerySet<TranslationRecord>> {
        let accessible = self.projects.all_acl(user)?;
        if accessible.count()? == self.projects.all().count()? {
            return Ok(self.all());
        }
        Ok(self
            .all()
            .filter(Condition::InQuery("s.project_id", accessible.values("p.id"))))
    }

    /// Translation of a subproject into a language
    pub fn get(&self, subproject: &SubProjectRecord, code: &str) -> Result<TranslationRecord, LookupError> {
        self.all()
            .filter(Condition::eq("t.subproject_id", subproject.id))
            .filter(Condition::eq("t.language_code", normalize_code(code)))
            .get()
    }

    /// Import one translation file of a subproject
    ///
    /// `filename` is relative to `checkout_dir`. The language and the
    /// translation are created on first import. Unchanged files (same content
    /// and template) are skipped unless `force` is set.
    pub fn update_from_file(
        &self,
        subproject: &SubProjectRecord,
        checkout_dir: &Path,
        code: &str,
        filename: &str,
        force: bool,
    ) -> Result<ImportSummary> {
        let language = self.repository.get_or_create_language(code)?;
        let (translation, _) = self.repository.get_or_create_translation(subproject, &language)?;

        let path = checkout_dir.join(filename);
        let content = std::fs::read(&path)
            .with_context(|| format!("Failed to read translation file: {}", path.display()))?;

        let template_path = subproject
            .has_template()
            .then(|| checkout_dir.join(&subproject.template));

        let mut revision_input = content.clone();
        if let Some(template_path) = &template_path {
            let template = std::fs::read(template_path).with_context(|| {
                format!("Failed to read template file: {}", template_path.display())
            })?;
            revision_input.extend_from_slice(&template);
        }
        let revision = hash_content(&revision_input);

        // A renamed file always needs a reload
        if !force && translation.filename == filename && translation.revision == revision {
            debug!(
                "Skipping unchanged {} ({})",
                translation.full_slug(),
                translation.language_code
            );
            return Ok(ImportSummary {
                translation,
                skipped: true,
                created: 0,
                updated: 0,
                deleted: 0,
            });
        }

        info!(
            "Importing {} into {} ({})",
            path.display(),
            subproject.full_slug(),
            language.code
        );

        let store = load_store(&path)
            .with_context(|| format!("Failed to parse translation file: {}", path.display()))?;
        let template = template_path
            .as_deref()
            .map(load_store)
            .transpose()
            .context("Failed to parse template file")?;

        let mut seen: Vec<i64> = Vec::new();
        let mut to_index = Vec::new();
        let mut created = 0;
        let mut updated = 0;

        let mut record = |outcome: SyncOutcome| {
            if let Some(id) = outcome.unit.id {
                seen.push(id);
            }
            if outcome.created {
                created += 1;
            } else if outcome.changed {
                updated += 1;
            }
            if outcome.changed {
                to_index.push((outcome.unit, outcome.created));
            }
        };

        match &template {
            Some(template) => {
                for (pos, template_unit) in template
                    .units
                    .iter()
                    .filter(|unit| unit.is_translatable())
                    .enumerate()
                {
                    let template_unit = template_unit.as_ref();
                    let untranslated = UntranslatedUnit::new(template_unit);
                    let unit: &dyn TranslatableUnit = match store.find_by_context(template_unit.context()) {
                        Some(unit) => unit,
                        None => &untranslated,
                    };
                    record(self.units.sync_unit(&translation, unit, pos + 1, Some(template_unit))?);
                }
            }
            None => {
                for (pos, unit) in store
                    .units
                    .iter()
                    .filter(|unit| unit.is_translatable())
                    .enumerate()
                {
                    record(self.units.sync_unit(&translation, unit.as_ref(), pos + 1, None)?);
                }
            }
        }

        let deleted = self
            .units
            .for_translation(&translation)
            .exclude(Condition::is_in("u.id", seen))
            .delete()?;

        self.repository
            .set_translation_file(translation.id, filename, &revision)?;
        let translation = self.repository.update_translation_stats(translation.id)?;

        self.units.add_units_to_index(&to_index)?;

        info!(
            "Imported {} ({}): {} created, {} updated, {} deleted",
            translation.full_slug(),
            translation.language_code,
            created,
            updated,
            deleted
        );

        Ok(ImportSummary {
            translation,
            skipped: false,
            created,
            updated,
            deleted,
        })
    }

    /// Import every file of a checkout matching the subproject's file mask
    pub fn scan_subproject(
        &self,
        subproject: &SubProjectRecord,
        checkout_dir: &Path,
        force: bool,
    ) -> Result<Vec<ImportSummary>> {
        let mask = filemask_regex(&subproject.filemask)?;
        let mut found = Vec::new();

        for entry in WalkDir::new(checkout_dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to scan {}", checkout_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(checkout_dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if subproject.has_template() && relative == subproject.template {
                continue;
            }

            if let Some(code) = mask.captures(&relative).and_then(|caps| caps.get(1)) {
                found.push((code.as_str().to_string(), relative.clone()));
            }
        }

        if found.is_empty() {
            warn!(
                "No files matching {:?} found for {}",
                subproject.filemask,
                subproject.full_slug()
            );
        }

        let mut seen_codes = HashSet::new();
        let mut summaries = Vec::with_capacity(found.len());
        for (code, filename) in found {
            if !seen_codes.insert(normalize_code(&code)) {
                warn!("Skipping {}: language {} already imported", filename, code);
                continue;
            }
            summaries.push(self.update_from_file(subproject, checkout_dir, &code, &filename, force)?);
        }

        Ok(summaries)
    }
}

/// Compile a file mask such as `po/*.po` into an anchored pattern capturing the language
pub fn filemask_regex(filemask: &str) -> Result<Regex> {
    let pattern = regex::escape(filemask).replacen(r"\*", "([^/]*)", 1);
    Regex::new(&format!("^{}$", pattern))
        .with_context(|| format!("Invalid file mask: {}", filemask))
}
