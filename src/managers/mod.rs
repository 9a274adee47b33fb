/*!
 * Entity managers.
 *
 * Each manager wraps one table and builds lazily evaluated `QuerySet`s over
 * it:
 * - `ProjectManager`, `SubProjectManager`, `TranslationManager`: access
 *   control and lookups
 * - `UnitManager`: file synchronization, request-type filters, cached
 *   counters and full-text search
 * - `DictionaryManager`: glossary upload and lookups
 * - `ChangeManager`: change history
 *
 * `Managers` wires them to one database, cache, index and check registry.
 */

pub mod change;
pub mod dictionary;
pub mod project;
pub mod subproject;
pub mod translation;
pub mod unit;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::app_config::Config;
use crate::cache::{CacheBackend, MemoryCache};
use crate::checks::CheckRegistry;
use crate::database::{DatabaseConnection, ProjectRecord, Repository, SubProjectRecord};
use crate::errors::AppError;
use crate::fulltext::{FulltextIndex, IndexQueue};
use crate::validators::{validate_commit_message, validate_filemask, validate_repo, validate_repoweb};

pub use change::ChangeManager;
pub use dictionary::DictionaryManager;
pub use project::ProjectManager;
pub use subproject::SubProjectManager;
pub use translation::{ImportSummary, TranslationManager};
pub use unit::{RequestType, SearchFields, SyncOutcome, UnitManager, UnitSettings};

/// All managers sharing one set of backends
#[derive(Clone)]
pub struct Managers {
    pub projects: ProjectManager,
    pub subprojects: SubProjectManager,
    pub translations: TranslationManager,
    pub units: UnitManager,
    pub dictionary: DictionaryManager,
    pub changes: ChangeManager,
    pub repository: Repository,
    pub queue: IndexQueue,
    db: DatabaseConnection,
    index: Arc<FulltextIndex>,
}

impl Managers {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn CacheBackend>,
        index: Arc<FulltextIndex>,
        checks: Arc<CheckRegistry>,
        config: &Config,
    ) -> Self {
        let units = UnitManager::new(
            db.clone(),
            cache,
            index.clone(),
            checks,
            UnitSettings::from(config),
        );

        Self {
            projects: ProjectManager::new(db.clone()),
            subprojects: SubProjectManager::new(db.clone()),
            translations: TranslationManager::new(db.clone(), units.clone()),
            units,
            dictionary: DictionaryManager::new(db.clone()),
            changes: ChangeManager::new(db.clone()),
            repository: Repository::new(db.clone()),
            queue: IndexQueue::new(db.clone()),
            db,
            index,
        }
    }

    /// Open the database and index files named by the configuration
    pub fn open(config: &Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let db_path = config.resolved_database_path()?;
        let index_path = config.resolved_index_path()?;
        let db = DatabaseConnection::new(&db_path)?;
        let index = FulltextIndex::open(&index_path)?;

        info!(
            "Using database {} and index {}",
            db_path.display(),
            index_path.display()
        );
        Ok(Self::with_backends(db, index, config))
    }

    /// Fresh in-memory database and index
    pub fn in_memory(config: &Config) -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        let index = FulltextIndex::in_memory()?;
        Ok(Self::with_backends(db, index, config))
    }

    fn with_backends(db: DatabaseConnection, index: FulltextIndex, config: &Config) -> Self {
        let cache: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new(
            config.cache.enabled,
            config.cache.default_ttl(),
        ));
        Self::new(db, cache, Arc::new(index), Arc::new(CheckRegistry::default()), config)
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn index(&self) -> &FulltextIndex {
        &self.index
    }

    /// Insert a project
    pub fn create_project(&self, project: &ProjectRecord) -> Result<ProjectRecord, AppError> {
        Ok(self.repository.create_project(project)?)
    }

    /// Validate and insert a subproject
    ///
    /// Empty repository browser and commit message templates are not checked.
    pub fn create_subproject(&self, subproject: &SubProjectRecord) -> Result<SubProjectRecord, AppError> {
        if !subproject.repoweb.is_empty() {
            validate_repoweb(&subproject.repoweb)?;
        }
        if !subproject.commit_message.is_empty() {
            validate_commit_message(&subproject.commit_message)?;
        }
        validate_filemask(&subproject.filemask)?;
        validate_repo(&subproject.repo, &self.subprojects)?;

        Ok(self.repository.create_subproject(subproject)?)
    }
}
