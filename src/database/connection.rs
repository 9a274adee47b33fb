/*!
 * SQLite connection shared by the managers.
 *
 * Statements are serialized through one mutex. The same wrapper backs the
 * relational store and the full-text index database, each opened with its
 * own schema initializer.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "weblate.db";

/// Default full-text index filename
const DEFAULT_INDEX_FILENAME: &str = "fulltext.db";

/// Directory under the user's data directory holding both files
const DEFAULT_DB_DIRNAME: &str = "weblate-trans";

/// Schema initializer run when a connection is opened
pub type SchemaInitializer = fn(&Connection) -> Result<()>;

/// Cloneable handle on one SQLite connection
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the relational store at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::open_with(db_path, schema::initialize_schema)
    }

    /// Open a database file and run the given schema initializer
    pub fn open_with<P: AsRef<Path>>(db_path: P, init: SchemaInitializer) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening {}", db_path.display());

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        init(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Relational store that lives as long as the handle
    pub fn new_in_memory() -> Result<Self> {
        Self::in_memory_with(schema::initialize_schema)
    }

    pub fn in_memory_with(init: SchemaInitializer) -> Result<Self> {
        debug!("Creating in-memory database");

        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        init(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_database_path() -> Result<PathBuf> {
        Ok(Self::default_data_dir()?.join(DEFAULT_DB_FILENAME))
    }

    pub fn default_index_path() -> Result<PathBuf> {
        Ok(Self::default_data_dir()?.join(DEFAULT_INDEX_FILENAME))
    }

    fn default_data_dir() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME))
    }

    /// File path, `:memory:` for in-memory databases
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Acquire the connection for a scoped sequence of statements
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))
    }

    /// Run statements while holding the connection
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run statements in one transaction, rolled back when `f` fails
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T>,
    {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Row counts of the main tables and the file size
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let count = |table: &str| -> Result<i64> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                conn.query_row(&sql, [], |row| row.get(0))
                    .with_context(|| format!("Failed to count {}", table))
            };

            // In-memory databases have no file
            let file_size = std::fs::metadata(&self.db_path)
                .map(|m| m.len())
                .unwrap_or(0);

            Ok(DatabaseStats {
                project_count: count("projects")?,
                translation_count: count("translations")?,
                unit_count: count("units")?,
                pending_index_updates: count("index_updates")?,
                file_size_bytes: file_size,
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub project_count: i64,
    pub translation_count: i64,
    /// Units across all translations
    pub unit_count: i64,
    /// Index updates waiting for the consumer
    pub pending_index_updates: i64,
    pub file_size_bytes: u64,
}
