/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data. Records loaded through a
 * `QuerySet` carry a few joined columns (project, language) so callers
 * do not need extra lookups for scoping.
 */

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::query::Record;
use crate::util::{is_repo_link, msg_checksum};

/// Current time as a fixed-width RFC 3339 timestamp
///
/// Fixed width keeps lexicographic order equal to chronological order,
/// which the `timestamp >= ?` filters rely on.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Format a point in time the way timestamps are stored
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Identity of the caller, supplied by the host application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// Login name, `None` for anonymous visitors
    pub username: Option<String>,
    /// Superusers pass every permission check
    pub is_superuser: bool,
    /// Granted permission codes
    pub permissions: HashSet<String>,
}

impl User {
    /// Anonymous visitor
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated user without extra permissions
    pub fn new(username: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    /// Authenticated superuser
    pub fn superuser(username: &str) -> Self {
        Self {
            is_superuser: true,
            ..Self::new(username)
        }
    }

    /// Grant a permission code
    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }

    /// Whether the user holds a permission; inactive for anonymous users
    pub fn has_perm(&self, permission: &str) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.is_superuser || self.permissions.contains(permission)
    }
}

/// Kind of a recorded change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Translation updated from the file
    Update,
    /// Translation reached 100 %
    Complete,
    /// Existing translation changed by a user
    Change,
    /// Comment added
    Comment,
    /// Suggestion added
    Suggestion,
    /// New translation by a user
    New,
    /// Automatic translation
    Auto,
}

impl ChangeAction {
    /// Value stored in the `action` column
    pub fn code(self) -> i64 {
        match self {
            ChangeAction::Update => 0,
            ChangeAction::Complete => 1,
            ChangeAction::Change => 2,
            ChangeAction::Comment => 3,
            ChangeAction::Suggestion => 4,
            ChangeAction::New => 5,
            ChangeAction::Auto => 6,
        }
    }

    /// Inverse of `code`
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ChangeAction::Update),
            1 => Some(ChangeAction::Complete),
            2 => Some(ChangeAction::Change),
            3 => Some(ChangeAction::Comment),
            4 => Some(ChangeAction::Suggestion),
            5 => Some(ChangeAction::New),
            6 => Some(ChangeAction::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Complete => write!(f, "complete"),
            ChangeAction::Change => write!(f, "change"),
            ChangeAction::Comment => write!(f, "comment"),
            ChangeAction::Suggestion => write!(f, "suggestion"),
            ChangeAction::New => write!(f, "new"),
            ChangeAction::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ChangeAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "update" => Ok(ChangeAction::Update),
            "complete" => Ok(ChangeAction::Complete),
            "change" => Ok(ChangeAction::Change),
            "comment" => Ok(ChangeAction::Comment),
            "suggestion" => Ok(ChangeAction::Suggestion),
            "new" => Ok(ChangeAction::New),
            "auto" => Ok(ChangeAction::Auto),
            _ => Err(anyhow::anyhow!("Invalid change action: {}", s)),
        }
    }
}

/// Language record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub id: i64,
    /// Locale code, e.g. `pt_BR`
    pub code: String,
    /// Human readable name
    pub name: String,
}

impl Record for LanguageRecord {
    const ENTITY: &'static str = "Language";
    const TABLE: &'static str = "languages";
    const FROM: &'static str = "languages l";
    const COLUMNS: &'static str = "l.id, l.code, l.name";
    const PK: &'static str = "l.id";
    const ORDER: &'static str = "l.code";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
        })
    }
}

/// Project record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Project website
    pub web: String,
    /// Restrict access to users holding the project permission
    pub enable_acl: bool,
}

impl ProjectRecord {
    /// Unsaved project
    pub fn new(name: &str, slug: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            slug: slug.to_string(),
            web: String::new(),
            enable_acl: false,
        }
    }

    /// Permission code granting access to an ACL protected project
    pub fn acl_permission(&self) -> String {
        format!("trans.weblate_acl_{}", self.slug)
    }

    /// Whether the user may access this project
    pub fn has_acl(&self, user: &User) -> bool {
        if !self.enable_acl {
            return true;
        }
        user.is_authenticated() && user.has_perm(&self.acl_permission())
    }
}

impl Record for ProjectRecord {
    const ENTITY: &'static str = "Project";
    const TABLE: &'static str = "projects";
    const FROM: &'static str = "projects p";
    const COLUMNS: &'static str = "p.id, p.name, p.slug, p.web, p.enable_acl";
    const PK: &'static str = "p.id";
    const ORDER: &'static str = "p.name, p.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            web: row.get(3)?,
            enable_acl: row.get(4)?,
        })
    }
}

/// Subproject (component) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProjectRecord {
    pub id: i64,
    pub project_id: i64,
    /// Slug of the owning project (joined)
    pub project_slug: String,
    pub name: String,
    pub slug: String,
    /// Repository URL or `weblate://project/subproject` link
    pub repo: String,
    /// Repository browser URL template
    pub repoweb: String,
    pub branch: String,
    /// Path mask of translation files, `*` stands for the language code
    pub filemask: String,
    /// Monolingual base file, empty for bilingual formats
    pub template: String,
    /// Commit message template
    pub commit_message: String,
}

impl SubProjectRecord {
    /// Unsaved subproject of a project
    pub fn new(project: &ProjectRecord, name: &str, slug: &str, repo: &str, filemask: &str) -> Self {
        Self {
            id: 0,
            project_id: project.id,
            project_slug: project.slug.clone(),
            name: name.to_string(),
            slug: slug.to_string(),
            repo: repo.to_string(),
            repoweb: String::new(),
            branch: "master".to_string(),
            filemask: filemask.to_string(),
            template: String::new(),
            commit_message: String::new(),
        }
    }

    /// `<project>__<subproject>`, unique across the installation
    pub fn full_slug(&self) -> String {
        format!("{}__{}", self.project_slug, self.slug)
    }

    /// Whether the repository is a link to another subproject
    pub fn is_repo_link(&self) -> bool {
        is_repo_link(&self.repo)
    }

    /// Whether translations are driven by a monolingual template
    pub fn has_template(&self) -> bool {
        !self.template.is_empty()
    }
}

impl Record for SubProjectRecord {
    const ENTITY: &'static str = "SubProject";
    const TABLE: &'static str = "subprojects";
    const FROM: &'static str = "subprojects s JOIN projects p ON p.id = s.project_id";
    const COLUMNS: &'static str = "s.id, s.project_id, p.slug, s.name, s.slug, s.repo, \
        s.repoweb, s.branch, s.filemask, s.template, s.commit_message";
    const PK: &'static str = "s.id";
    const ORDER: &'static str = "p.name, s.name, s.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            project_slug: row.get(2)?,
            name: row.get(3)?,
            slug: row.get(4)?,
            repo: row.get(5)?,
            repoweb: row.get(6)?,
            branch: row.get(7)?,
            filemask: row.get(8)?,
            template: row.get(9)?,
            commit_message: row.get(10)?,
        })
    }
}

/// Translation of a subproject into one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub subproject_id: i64,
    /// Owning project (joined)
    pub project_id: i64,
    /// Owning project slug (joined)
    pub project_slug: String,
    /// Subproject slug (joined)
    pub subproject_slug: String,
    pub language_id: i64,
    pub language_code: String,
    /// Path of the translation file, relative to the checkout
    pub filename: String,
    /// Content hash of the last imported file
    pub revision: String,
    pub enabled: bool,
    /// Number of units
    pub total: i64,
    /// Units needing review
    pub fuzzy: i64,
    /// Translated units
    pub translated: i64,
}

impl TranslationRecord {
    /// `<project>__<subproject>` of the owning subproject
    pub fn full_slug(&self) -> String {
        format!("{}__{}", self.project_slug, self.subproject_slug)
    }

    fn percent(value: i64, total: i64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (value as f64 / total as f64 * 1000.0).round() / 10.0
    }

    pub fn translated_percent(&self) -> f64 {
        Self::percent(self.translated, self.total)
    }

    pub fn fuzzy_percent(&self) -> f64 {
        Self::percent(self.fuzzy, self.total)
    }
}

impl Record for TranslationRecord {
    const ENTITY: &'static str = "Translation";
    const TABLE: &'static str = "translations";
    const FROM: &'static str = "translations t \
        JOIN subprojects s ON s.id = t.subproject_id \
        JOIN projects p ON p.id = s.project_id";
    const COLUMNS: &'static str = "t.id, t.subproject_id, s.project_id, p.slug, s.slug, \
        t.language_id, t.language_code, t.filename, t.revision, t.enabled, \
        t.total, t.fuzzy, t.translated";
    const PK: &'static str = "t.id";
    const ORDER: &'static str = "p.name, s.name, t.language_code";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subproject_id: row.get(1)?,
            project_id: row.get(2)?,
            project_slug: row.get(3)?,
            subproject_slug: row.get(4)?,
            language_id: row.get(5)?,
            language_code: row.get(6)?,
            filename: row.get(7)?,
            revision: row.get(8)?,
            enabled: row.get(9)?,
            total: row.get(10)?,
            fuzzy: row.get(11)?,
            translated: row.get(12)?,
        })
    }
}

/// Single translatable string of a translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// `None` until the row is inserted
    pub id: Option<i64>,
    pub translation_id: i64,
    /// Owning project (joined)
    pub project_id: i64,
    /// Translation language (joined)
    pub language_id: i64,
    /// Translation language code (joined)
    pub language_code: String,
    /// Hash of source and context
    pub checksum: String,
    pub location: String,
    pub context: String,
    pub comment: String,
    pub flags: String,
    pub source: String,
    pub previous_source: String,
    pub target: String,
    /// Position within the file
    pub position: i64,
    pub fuzzy: bool,
    pub translated: bool,
}

impl UnitRecord {
    /// Unsaved unit of a translation
    pub fn new(translation: &TranslationRecord, source: &str, context: &str) -> Self {
        Self {
            id: None,
            translation_id: translation.id,
            project_id: translation.project_id,
            language_id: translation.language_id,
            language_code: translation.language_code.clone(),
            checksum: msg_checksum(source, context),
            location: String::new(),
            context: context.to_string(),
            comment: String::new(),
            flags: String::new(),
            source: source.to_string(),
            previous_source: String::new(),
            target: String::new(),
            position: 0,
            fuzzy: false,
            translated: false,
        }
    }

    /// Whether the unit has a plural form
    pub fn is_plural(&self) -> bool {
        self.source.contains(crate::util::PLURAL_SEPARATOR)
    }
}

impl Record for UnitRecord {
    const ENTITY: &'static str = "Unit";
    const TABLE: &'static str = "units";
    const FROM: &'static str = "units u \
        JOIN translations t ON t.id = u.translation_id \
        JOIN subprojects s ON s.id = t.subproject_id";
    const COLUMNS: &'static str = "u.id, u.translation_id, s.project_id, t.language_id, \
        t.language_code, u.checksum, u.location, u.context, u.comment, u.flags, u.source, \
        u.previous_source, u.target, u.position, u.fuzzy, u.translated";
    const PK: &'static str = "u.id";
    const ORDER: &'static str = "u.translation_id, u.position, u.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            translation_id: row.get(1)?,
            project_id: row.get(2)?,
            language_id: row.get(3)?,
            language_code: row.get(4)?,
            checksum: row.get(5)?,
            location: row.get(6)?,
            context: row.get(7)?,
            comment: row.get(8)?,
            flags: row.get(9)?,
            source: row.get(10)?,
            previous_source: row.get(11)?,
            target: row.get(12)?,
            position: row.get(13)?,
            fuzzy: row.get(14)?,
            translated: row.get(15)?,
        })
    }
}

/// Entry of the change history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub unit_id: Option<i64>,
    pub translation_id: i64,
    /// Author, `None` for changes made by the system
    pub username: Option<String>,
    pub action: ChangeAction,
    pub target: String,
    pub timestamp: String,
}

impl Record for ChangeRecord {
    const ENTITY: &'static str = "Change";
    const TABLE: &'static str = "changes";
    const FROM: &'static str = "changes c";
    const COLUMNS: &'static str =
        "c.id, c.unit_id, c.translation_id, c.username, c.action, c.target, c.timestamp";
    const PK: &'static str = "c.id";
    const ORDER: &'static str = "c.timestamp DESC, c.id DESC";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let code: i64 = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            unit_id: row.get(1)?,
            translation_id: row.get(2)?,
            username: row.get(3)?,
            action: ChangeAction::from_code(code).unwrap_or(ChangeAction::Update),
            target: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }
}

/// Glossary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub id: i64,
    pub project_id: i64,
    pub language_id: i64,
    pub source: String,
    pub target: String,
}

impl Record for DictionaryRecord {
    const ENTITY: &'static str = "Dictionary";
    const TABLE: &'static str = "dictionary";
    const FROM: &'static str = "dictionary d";
    const COLUMNS: &'static str = "d.id, d.project_id, d.language_id, d.source, d.target";
    const PK: &'static str = "d.id";
    const ORDER: &'static str = "d.source, d.id";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            language_id: row.get(2)?,
            source: row.get(3)?,
            target: row.get(4)?,
        })
    }
}
