/*!
 * Unit manager: synchronization with parsed files, request-type filtering,
 * cached counting and full-text search.
 */

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rusqlite::types::Value;
use serde_json::json;

use crate::app_config::Config;
use crate::cache::CacheBackend;
use crate::checks::CheckRegistry;
use crate::database::models::format_timestamp;
use crate::database::{ChangeRecord, DatabaseConnection, Repository, TranslationRecord, UnitRecord, User};
use crate::errors::LookupError;
use crate::formats::TranslatableUnit;
use crate::fulltext::terms::{combinations, IGNORE_SIMILAR};
use crate::fulltext::{Document, FulltextIndex, IndexQueue};
use crate::query::{Condition, QuerySet, SubQuery};
use crate::util::msg_checksum;

/// Maximum number of key terms used to look up similar units
const SIMILAR_TERMS: usize = 10;

/// How many terms `similar` may drop before giving up
const SIMILAR_MAX_DROPPED: usize = 4;

/// Symbolic unit filter used by listings and counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestType {
    All,
    Fuzzy,
    Untranslated,
    Suggestions,
    SourceComments,
    TargetComments,
    /// Any failing check on the translation
    AllChecks,
    /// Any failing check on the source string
    SourceChecks,
    /// One registered check
    Check(String),
}

impl RequestType {
    /// Map a request string to a filter
    ///
    /// Unknown strings fall back to `All`.
    pub fn parse(name: &str, checks: &CheckRegistry) -> Self {
        match name {
            "all" => RequestType::All,
            "fuzzy" => RequestType::Fuzzy,
            "untranslated" => RequestType::Untranslated,
            "suggestions" => RequestType::Suggestions,
            "sourcecomments" => RequestType::SourceComments,
            "targetcomments" => RequestType::TargetComments,
            "allchecks" => RequestType::AllChecks,
            "sourcechecks" => RequestType::SourceChecks,
            other if checks.contains(other) => RequestType::Check(other.to_string()),
            other => {
                debug!("Unknown request type {:?}, showing all units", other);
                RequestType::All
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RequestType::All => "all",
            RequestType::Fuzzy => "fuzzy",
            RequestType::Untranslated => "untranslated",
            RequestType::Suggestions => "suggestions",
            RequestType::SourceComments => "sourcecomments",
            RequestType::TargetComments => "targetcomments",
            RequestType::AllChecks => "allchecks",
            RequestType::SourceChecks => "sourcechecks",
            RequestType::Check(name) => name,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which index fields a search looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFields {
    pub source: bool,
    pub context: bool,
    pub target: bool,
}

impl SearchFields {
    /// Source, context and translation
    pub fn all() -> Self {
        Self {
            source: true,
            context: true,
            target: true,
        }
    }

    pub fn source_only() -> Self {
        Self {
            source: true,
            context: false,
            target: false,
        }
    }
}

impl Default for SearchFields {
    fn default() -> Self {
        Self::all()
    }
}

/// Indexing and lookup settings of the unit manager
#[derive(Debug, Clone, Copy)]
pub struct UnitSettings {
    pub offload_indexing: bool,
    pub similar_messages: usize,
}

impl From<&Config> for UnitSettings {
    fn from(config: &Config) -> Self {
        Self {
            offload_indexing: config.offload_indexing,
            similar_messages: config.similar_messages,
        }
    }
}

/// Result of synchronizing one parsed entry
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub unit: UnitRecord,
    /// Row was created or recreated
    pub created: bool,
    /// Row content was written
    pub changed: bool,
}

/// Language restriction of auxiliary records
enum LanguageScope {
    /// Records of one language
    Language(i64),
    /// Source-level records (no language)
    Source,
    /// Either of the above
    Either(i64),
}

impl LanguageScope {
    fn compile(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            LanguageScope::Language(id) => {
                sql.push_str(" AND language_id = ?");
                params.push((*id).into());
            }
            LanguageScope::Source => sql.push_str(" AND language_id IS NULL"),
            LanguageScope::Either(id) => {
                sql.push_str(" AND (language_id = ? OR language_id IS NULL)");
                params.push((*id).into());
            }
        }
    }
}

/// Checksums of auxiliary rows of a project, as a sub-select
fn scoped_checksums(table: &str, project_id: i64, scope: LanguageScope, extra: &[(&str, Value)]) -> SubQuery {
    let mut sql = format!("SELECT checksum FROM {} WHERE project_id = ?", table);
    let mut params: Vec<Value> = vec![project_id.into()];
    scope.compile(&mut sql, &mut params);
    for (column, value) in extra {
        sql.push_str(&format!(" AND {} = ?", column));
        params.push(value.clone());
    }
    SubQuery::new(sql, params)
}

#[derive(Clone)]
pub struct UnitManager {
    db: DatabaseConnection,
    repository: Repository,
    cache: Arc<dyn CacheBackend>,
    index: Arc<FulltextIndex>,
    queue: IndexQueue,
    checks: Arc<CheckRegistry>,
    settings: UnitSettings,
}

impl UnitManager {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn CacheBackend>,
        index: Arc<FulltextIndex>,
        checks: Arc<CheckRegistry>,
        settings: UnitSettings,
    ) -> Self {
        Self {
            repository: Repository::new(db.clone()),
            queue: IndexQueue::new(db.clone()),
            db,
            cache,
            index,
            checks,
            settings,
        }
    }

    pub fn all(&self) -> QuerySet<UnitRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Units of one translation
    pub fn for_translation(&self, translation: &TranslationRecord) -> QuerySet<UnitRecord> {
        self.all()
            .filter(Condition::eq("u.translation_id", translation.id))
    }

    pub fn queue(&self) -> &IndexQueue {
        &self.queue
    }

    pub fn checks(&self) -> &CheckRegistry {
        &self.checks
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Store a parsed entry as a unit of the translation
    ///
    /// Returns the stored row and whether it was created (or recreated after
    /// cleaning up duplicate rows).
    pub fn update_from_unit(
        &self,
        translation: &TranslationRecord,
        unit: &dyn TranslatableUnit,
        pos: usize,
        template: Option<&dyn TranslatableUnit>,
    ) -> Result<(UnitRecord, bool)> {
        let outcome = self.sync_unit(translation, unit, pos, template)?;
        Ok((outcome.unit, outcome.created))
    }

    /// Like `update_from_unit`, also reporting whether anything was written
    pub fn sync_unit(
        &self,
        translation: &TranslationRecord,
        unit: &dyn TranslatableUnit,
        pos: usize,
        template: Option<&dyn TranslatableUnit>,
    ) -> Result<SyncOutcome> {
        let (source, context) = match template {
            Some(template) => (template.target(), template.context()),
            None => (unit.source(), unit.context()),
        };
        let checksum = msg_checksum(source, context);

        let matching = self
            .for_translation(translation)
            .filter(Condition::eq("u.checksum", checksum.clone()));

        let (mut dbunit, force) = match matching.get() {
            Ok(existing) => (existing, false),
            Err(LookupError::DoesNotExist { .. }) => {
                (UnitRecord::new(translation, source, context), true)
            }
            Err(LookupError::MultipleObjectsReturned { count, .. }) => {
                // Concurrent imports can leave duplicates behind; start over
                warn!(
                    "Found {} units with checksum {} in translation {}, recreating",
                    count, checksum, translation.id
                );
                matching.delete()?;
                (UnitRecord::new(translation, source, context), true)
            }
            Err(LookupError::Database(e)) => return Err(e),
        };

        let changed = apply_unit(&mut dbunit, unit, pos, template) || force;
        if changed {
            self.repository.save_unit(&mut dbunit)?;
        }

        Ok(SyncOutcome {
            unit: dbunit,
            created: force,
            changed,
        })
    }

    // =========================================================================
    // Filtering and counting
    // =========================================================================

    /// Units of the translation matching a request type
    pub fn filter_type(&self, rqtype: &RequestType, translation: &TranslationRecord) -> QuerySet<UnitRecord> {
        let units = self.for_translation(translation);
        let project = translation.project_id;
        let language = translation.language_id;

        match rqtype {
            RequestType::All => units,
            RequestType::Fuzzy => units.filter(Condition::eq("u.fuzzy", true)),
            RequestType::Untranslated => units.filter(Condition::eq("u.translated", false)),
            RequestType::Suggestions => units.filter(Condition::InQuery(
                "u.checksum",
                scoped_checksums("suggestions", project, LanguageScope::Language(language), &[]),
            )),
            RequestType::SourceComments => units.filter(Condition::InQuery(
                "u.checksum",
                scoped_checksums("comments", project, LanguageScope::Source, &[]),
            )),
            RequestType::TargetComments => units.filter(Condition::InQuery(
                "u.checksum",
                scoped_checksums("comments", project, LanguageScope::Language(language), &[]),
            )),
            RequestType::AllChecks => {
                let checks = scoped_checksums(
                    "checks",
                    project,
                    LanguageScope::Language(language),
                    &[("ignored", false.into())],
                );
                units
                    .filter(Condition::InQuery("u.checksum", checks))
                    .filter(Condition::eq("u.translated", true))
            }
            RequestType::SourceChecks => {
                let checks = scoped_checksums(
                    "checks",
                    project,
                    LanguageScope::Source,
                    &[("ignored", false.into())],
                );
                units.filter(Condition::InQuery("u.checksum", checks))
            }
            RequestType::Check(name) => {
                let Some(check) = self.checks.get(name) else {
                    debug!("Unknown check {:?}, showing all units", name);
                    return units;
                };

                // Source level failures apply whatever the translation state
                let (scope, filter_translated) = match (check.source, check.target) {
                    (true, true) => (Some(LanguageScope::Either(language)), false),
                    (true, false) => (Some(LanguageScope::Source), false),
                    (false, true) => (Some(LanguageScope::Language(language)), true),
                    (false, false) => (None, true),
                };

                let extra = [
                    ("ignored", Value::from(false)),
                    ("check_name", Value::from(name.clone())),
                ];
                let checks = match scope {
                    Some(scope) => scoped_checksums("checks", project, scope, &extra),
                    None => SubQuery::new(
                        "SELECT checksum FROM checks WHERE project_id = ? AND ignored = ? AND check_name = ?",
                        vec![project.into(), false.into(), name.clone().into()],
                    ),
                };

                let units = units.filter(Condition::InQuery("u.checksum", checks));
                if filter_translated {
                    units.filter(Condition::eq("u.translated", true))
                } else {
                    units
                }
            }
        }
    }

    /// Cache key of a counter
    pub fn count_cache_key(rqtype: &RequestType, translation: &TranslationRecord) -> String {
        format!(
            "counts-{}-{}-{}",
            translation.full_slug(),
            translation.language_code,
            rqtype
        )
    }

    /// Number of units matching a request type
    ///
    /// State counters come from the translation's aggregates. Everything
    /// else is counted once and kept in the cache for its default TTL.
    pub fn count_type(&self, rqtype: &RequestType, translation: &TranslationRecord) -> Result<usize> {
        match rqtype {
            RequestType::All => return Ok(translation.total.max(0) as usize),
            RequestType::Fuzzy => return Ok(translation.fuzzy.max(0) as usize),
            RequestType::Untranslated => {
                return Ok((translation.total - translation.translated).max(0) as usize);
            }
            _ => {}
        }

        let key = Self::count_cache_key(rqtype, translation);
        if let Some(count) = self.cache.get(&key).and_then(|value| value.as_u64()) {
            return Ok(count as usize);
        }

        let count = self.filter_type(rqtype, translation).count()?;
        self.cache.set(&key, json!(count), None);
        Ok(count)
    }

    // =========================================================================
    // Review and lookups
    // =========================================================================

    /// Units of the translation changed by other users since a point in time
    pub fn review(&self, translation: &TranslationRecord, since: DateTime<Utc>, user: &User) -> QuerySet<UnitRecord> {
        let units = self.for_translation(translation);
        if user.is_anonymous() {
            return units.none();
        }

        let changes = QuerySet::<ChangeRecord>::all(self.db.clone())
            .filter(Condition::eq("c.translation_id", translation.id))
            .filter(Condition::Gte("c.timestamp", format_timestamp(since).into()))
            .filter(Condition::IsNot("c.username", user.username.clone().into()));

        units.filter(Condition::InQuery("u.id", changes.values("c.unit_id")))
    }

    /// Units with the same source and context in the project and language
    pub fn same(&self, unit: &UnitRecord) -> QuerySet<UnitRecord> {
        self.all()
            .filter(Condition::eq("u.checksum", unit.checksum.clone()))
            .filter(Condition::eq("s.project_id", unit.project_id))
            .filter(Condition::eq("t.language_id", unit.language_id))
    }

    // =========================================================================
    // Full-text index
    // =========================================================================

    /// Index a unit, or queue it when indexing is offloaded
    pub fn add_to_index(&self, unit: &UnitRecord, source: bool) -> Result<()> {
        self.add_units_to_index(&[(unit.clone(), source)])
    }

    /// Index a batch of units; the flag tells whether to update the source index
    pub fn add_units_to_index(&self, entries: &[(UnitRecord, bool)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if self.settings.offload_indexing {
            for (unit, source) in entries {
                let unit_id = unit
                    .id
                    .ok_or_else(|| anyhow!("Cannot queue unsaved unit {}", unit.checksum))?;
                self.queue.enqueue(unit_id, *source)?;
            }
            debug!("Queued {} index updates", entries.len());
            return Ok(());
        }

        let refs: Vec<(&UnitRecord, bool)> = entries.iter().map(|(u, s)| (u, *s)).collect();
        self.write_index(&refs)
    }

    fn write_index(&self, entries: &[(&UnitRecord, bool)]) -> Result<()> {
        let mut by_language: BTreeMap<&str, Vec<&UnitRecord>> = BTreeMap::new();
        for (unit, _) in entries {
            by_language
                .entry(unit.language_code.as_str())
                .or_default()
                .push(unit);
        }

        for (language, units) in by_language {
            let mut writer = self.index.target_writer(language)?;
            for unit in units {
                writer.update_document(&Document::Target {
                    checksum: &unit.checksum,
                    target: &unit.target,
                })?;
            }
            writer.commit()?;
        }

        let sources: Vec<&UnitRecord> = entries
            .iter()
            .filter(|(_, source)| *source)
            .map(|(unit, _)| *unit)
            .collect();
        if !sources.is_empty() {
            let mut writer = self.index.source_writer()?;
            for unit in sources {
                writer.update_document(&Document::Source {
                    checksum: &unit.checksum,
                    source: &unit.source,
                    context: &unit.context,
                })?;
            }
            writer.commit()?;
        }

        Ok(())
    }

    /// Apply up to `limit` queued index updates; returns how many were applied
    pub fn process_index_queue(&self, limit: usize) -> Result<usize> {
        let batch = self.queue.take(limit)?;
        if batch.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = batch.iter().map(|update| update.unit_id).collect();
        let units = self.all().filter(Condition::is_in("u.id", ids)).fetch()?;
        let by_id: HashMap<i64, &UnitRecord> = units
            .iter()
            .filter_map(|unit| unit.id.map(|id| (id, unit)))
            .collect();

        let entries: Vec<(&UnitRecord, bool)> = batch
            .iter()
            .filter_map(|update| by_id.get(&update.unit_id).map(|unit| (*unit, update.source)))
            .collect();

        self.write_index(&entries)?;
        self.queue.acknowledge(&batch)?;

        info!("Processed {} queued index updates", entries.len());
        Ok(entries.len())
    }

    /// Checksums of indexed units matching the query
    pub fn search(&self, query: &str, fields: SearchFields, language: &str) -> Result<HashSet<String>> {
        let mut ret = HashSet::new();

        if fields.source || fields.context {
            let searcher = self.index.source_searcher()?;
            if fields.source {
                ret.extend(searcher.search("source", query)?);
            }
            if fields.context {
                ret.extend(searcher.search("context", query)?);
            }
        }

        if fields.target {
            let searcher = self.index.target_searcher(language)?;
            ret.extend(searcher.search("target", query)?);
        }

        Ok(ret)
    }

    /// Units of the translation matching a full-text query
    pub fn search_units(
        &self,
        translation: &TranslationRecord,
        query: &str,
        fields: SearchFields,
    ) -> Result<QuerySet<UnitRecord>> {
        let checksums = self.search(query, fields, &translation.language_code)?;
        Ok(self
            .for_translation(translation)
            .filter(Condition::is_in("u.checksum", checksums)))
    }

    /// Units with a similar source string, usable as translation suggestions
    ///
    /// Searches with the unit's key terms, dropping terms one at a time until
    /// enough candidates are found. Only translated units of the same project
    /// and language with a different translation are returned.
    pub fn similar(&self, unit: &UnitRecord) -> Result<QuerySet<UnitRecord>> {
        let mut ret: HashSet<String> = HashSet::from([unit.checksum.clone()]);

        let terms: Vec<String> = {
            let searcher = self.index.source_searcher()?;
            searcher
                .key_terms("source", &unit.source, SIMILAR_TERMS)?
                .into_iter()
                .map(|(term, _)| term)
                .filter(|term| !IGNORE_SIMILAR.contains(term.as_str()))
                .collect()
        };

        let mut cnt = terms.len();
        while ret.len() < self.settings.similar_messages
            && cnt > 0
            && terms.len() - cnt < SIMILAR_MAX_DROPPED
        {
            for subset in combinations(&terms, cnt) {
                let hits = self.search(&subset.join(" "), SearchFields::source_only(), &unit.language_code)?;
                ret.extend(hits);
            }
            cnt -= 1;
        }

        debug!(
            "Similar lookup for {} used {:?}, {} candidate checksums",
            unit.checksum,
            terms,
            ret.len()
        );

        Ok(self
            .all()
            .filter(Condition::eq("s.project_id", unit.project_id))
            .filter(Condition::eq("t.language_id", unit.language_id))
            .filter(Condition::is_in("u.checksum", ret))
            .exclude(Condition::is_in(
                "u.target",
                [String::new(), unit.target.clone()],
            )))
    }
}

/// Copy the details of a parsed entry onto a row; returns whether anything changed
fn apply_unit(
    dbunit: &mut UnitRecord,
    unit: &dyn TranslatableUnit,
    pos: usize,
    template: Option<&dyn TranslatableUnit>,
) -> bool {
    let details = template.unwrap_or(unit);
    let position = pos as i64;
    let fuzzy = unit.is_fuzzy();
    let translated = unit.is_translated();

    let unchanged = dbunit.location == details.location()
        && dbunit.flags == details.flags()
        && dbunit.comment == details.comment()
        && dbunit.target == unit.target()
        && dbunit.previous_source == unit.previous_source()
        && dbunit.fuzzy == fuzzy
        && dbunit.translated == translated
        && dbunit.position == position;
    if unchanged {
        return false;
    }

    dbunit.location = details.location().to_string();
    dbunit.flags = details.flags().to_string();
    dbunit.comment = details.comment().to_string();
    dbunit.target = unit.target().to_string();
    dbunit.previous_source = unit.previous_source().to_string();
    dbunit.fuzzy = fuzzy;
    dbunit.translated = translated;
    dbunit.position = position;
    true
}
