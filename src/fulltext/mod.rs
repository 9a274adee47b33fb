/*!
 * Full-text index of translation units.
 *
 * The index lives in its own SQLite database and uses FTS5 tables:
 * - `source_index(checksum, source, context)` shared by all languages
 * - `target_index_<code>(checksum, target)`, one per language, created on
 *   first write
 *
 * Access goes through scoped handles. A writer holds an immediate write
 * transaction that is committed explicitly and rolled back when the handle
 * is dropped uncommitted. A searcher holds one read transaction, giving a
 * consistent snapshot for a burst of queries, and ends it on drop.
 *
 * Only one handle per index can be alive at a time; callers must drop a
 * handle before acquiring the next one.
 */

pub mod queue;
pub mod terms;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::MutexGuard;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::DatabaseConnection;

pub use queue::{IndexQueue, IndexUpdate};

/// Name of the shared source index table
const SOURCE_TABLE: &str = "source_index";

/// Which index a handle operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKind {
    /// Source strings and contexts
    Source,
    /// Translations into one language
    Target(String),
}

impl IndexKind {
    fn table(&self) -> String {
        match self {
            IndexKind::Source => SOURCE_TABLE.to_string(),
            IndexKind::Target(code) => target_table(code),
        }
    }

    /// Searchable fields of the index
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            IndexKind::Source => &["source", "context"],
            IndexKind::Target(_) => &["target"],
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Source => write!(f, "source"),
            IndexKind::Target(code) => write!(f, "target[{}]", code),
        }
    }
}

/// Document stored in an index, keyed by unit checksum
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    Source {
        checksum: &'a str,
        source: &'a str,
        context: &'a str,
    },
    Target {
        checksum: &'a str,
        target: &'a str,
    },
}

impl Document<'_> {
    fn checksum(&self) -> &str {
        match self {
            Document::Source { checksum, .. } | Document::Target { checksum, .. } => checksum,
        }
    }
}

/// Table name of a language's target index
///
/// Lowercase ASCII letters and digits are kept, every other byte becomes
/// `_` plus two hex digits, so distinct codes never share a table.
fn target_table(code: &str) -> String {
    let mut name = String::from("target_index_");
    for byte in code.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() {
            name.push(byte as char);
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }
    name
}

fn create_target_table(conn: &Connection, table: &str) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS {table} USING fts5(
            checksum UNINDEXED,
            target,
            tokenize = 'unicode61 remove_diacritics 0'
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS {table}_vocab USING fts5vocab({table}, 'col');
        "#
    ))
    .with_context(|| format!("Failed to create index table {}", table))?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Schema of the index database
pub fn initialize_index_schema(conn: &Connection) -> Result<()> {
    // WAL mode for concurrent readers; in-memory databases ignore it
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .context("Failed to enable WAL mode")?;

    conn.execute_batch(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS source_index USING fts5(
            checksum UNINDEXED,
            source,
            context,
            tokenize = 'unicode61 remove_diacritics 0'
        );
        CREATE VIRTUAL TABLE IF NOT EXISTS source_index_vocab USING fts5vocab(source_index, 'col');
        "#,
    )
    .context("Failed to create source index")?;

    Ok(())
}

/// Build an FTS5 expression searching `field` for a user query
///
/// Bare words are ANDed, `"quoted phrases"` are matched as phrases and the
/// upper-case words `AND`, `OR` and `NOT` act as operators. Stop words and
/// punctuation-only words are dropped. Returns `None` when nothing
/// searchable remains.
pub fn match_expression(field: &str, query: &str) -> Option<String> {
    enum Token {
        Phrase(String),
        Operator(&'static str),
    }

    let mut tokens = Vec::new();
    let mut rest = query.trim();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('"') {
            let (phrase, tail) = match after.find('"') {
                Some(end) => (&after[..end], &after[end + 1..]),
                None => (after, ""),
            };
            if phrase.chars().any(char::is_alphanumeric) {
                tokens.push(Token::Phrase(phrase.to_string()));
            }
            rest = tail.trim_start();
            continue;
        }

        let end = rest.find(|c: char| c.is_whitespace() || c == '"').unwrap_or(rest.len());
        let word = &rest[..end];
        rest = rest[end..].trim_start();

        match word {
            "AND" => tokens.push(Token::Operator("AND")),
            "OR" => tokens.push(Token::Operator("OR")),
            "NOT" => tokens.push(Token::Operator("NOT")),
            _ => {
                let lowered = word.to_lowercase();
                if word.chars().any(char::is_alphanumeric)
                    && !terms::IGNORE_WORDS.contains(lowered.as_str())
                {
                    tokens.push(Token::Phrase(word.to_string()));
                }
            }
        }
    }

    // Operators need a phrase on both sides
    let mut parts: Vec<String> = Vec::new();
    let mut pending_op: Option<&'static str> = None;
    for token in tokens {
        match token {
            Token::Operator(op) => {
                if !parts.is_empty() {
                    pending_op = Some(op);
                }
            }
            Token::Phrase(phrase) => {
                if let Some(op) = pending_op.take() {
                    parts.push(op.to_string());
                }
                parts.push(format!("{} : \"{}\"", field, phrase.replace('"', "\"\"")));
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Handle to the full-text index database
#[derive(Clone)]
pub struct FulltextIndex {
    db: DatabaseConnection,
}

impl FulltextIndex {
    /// Open (or create) the index database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = DatabaseConnection::open_with(path, initialize_index_schema)?;
        Ok(Self { db })
    }

    /// Create an in-memory index (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = DatabaseConnection::in_memory_with(initialize_index_schema)?;
        Ok(Self { db })
    }

    /// Index database path
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    fn writer(&self, kind: IndexKind) -> Result<IndexWriter<'_>> {
        let conn = self.db.lock()?;
        let table = kind.table();
        if let IndexKind::Target(_) = kind {
            create_target_table(&conn, &table)?;
        }
        conn.execute_batch("BEGIN IMMEDIATE")
            .with_context(|| format!("Failed to open {} index writer", kind))?;

        Ok(IndexWriter {
            conn,
            table,
            kind,
            pending: 0,
            finished: false,
        })
    }

    fn searcher(&self, kind: IndexKind) -> Result<IndexSearcher<'_>> {
        let conn = self.db.lock()?;
        let table = kind.table();
        let table = table_exists(&conn, &table)?.then_some(table);
        conn.execute_batch("BEGIN DEFERRED")
            .with_context(|| format!("Failed to open {} index searcher", kind))?;

        Ok(IndexSearcher { conn, table, kind })
    }

    /// Writer for the source index
    pub fn source_writer(&self) -> Result<IndexWriter<'_>> {
        self.writer(IndexKind::Source)
    }

    /// Writer for a language's target index, created on first use
    pub fn target_writer(&self, language: &str) -> Result<IndexWriter<'_>> {
        self.writer(IndexKind::Target(language.to_string()))
    }

    /// Read snapshot of the source index
    pub fn source_searcher(&self) -> Result<IndexSearcher<'_>> {
        self.searcher(IndexKind::Source)
    }

    /// Read snapshot of a language's target index
    pub fn target_searcher(&self, language: &str) -> Result<IndexSearcher<'_>> {
        self.searcher(IndexKind::Target(language.to_string()))
    }
}

/// Scoped write transaction on one index
pub struct IndexWriter<'a> {
    conn: MutexGuard<'a, Connection>,
    table: String,
    kind: IndexKind,
    pending: usize,
    finished: bool,
}

impl IndexWriter<'_> {
    /// Add a document, replacing any document with the same checksum
    pub fn update_document(&mut self, document: &Document<'_>) -> Result<()> {
        self.delete_document(document.checksum())?;

        match (&self.kind, document) {
            (IndexKind::Source, Document::Source { checksum, source, context }) => {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {} (checksum, source, context) VALUES (?1, ?2, ?3)",
                        self.table
                    ),
                    params![checksum, source, context],
                )?;
            }
            (IndexKind::Target(_), Document::Target { checksum, target }) => {
                self.conn.execute(
                    &format!("INSERT INTO {} (checksum, target) VALUES (?1, ?2)", self.table),
                    params![checksum, target],
                )?;
            }
            (kind, _) => bail!("Document does not match the {} index", kind),
        }

        self.pending += 1;
        Ok(())
    }

    /// Remove the document with the given checksum
    pub fn delete_document(&mut self, checksum: &str) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE checksum = ?1", self.table),
            [checksum],
        )?;
        Ok(())
    }

    /// Make the written documents durable; returns how many were written
    pub fn commit(mut self) -> Result<usize> {
        self.conn
            .execute_batch("COMMIT")
            .with_context(|| format!("Failed to commit {} index", self.kind))?;
        self.finished = true;
        debug!("Committed {} documents to {} index", self.pending, self.kind);
        Ok(self.pending)
    }
}

impl Drop for IndexWriter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            warn!("Failed to roll back {} index writer: {}", self.kind, e);
        } else if self.pending > 0 {
            debug!("Discarded {} uncommitted {} documents", self.pending, self.kind);
        }
    }
}

/// Scoped read snapshot of one index
pub struct IndexSearcher<'a> {
    conn: MutexGuard<'a, Connection>,
    /// `None` when the index was never written to
    table: Option<String>,
    kind: IndexKind,
}

impl IndexSearcher<'_> {
    fn check_field(&self, field: &str) -> Result<()> {
        if !self.kind.fields().contains(&field) {
            bail!("Unknown field {} in {} index", field, self.kind);
        }
        Ok(())
    }

    /// Checksums of documents matching the query in the given field
    pub fn search(&self, field: &str, query: &str) -> Result<HashSet<String>> {
        self.check_field(field)?;
        let Some(table) = &self.table else {
            return Ok(HashSet::new());
        };
        let Some(expression) = match_expression(field, query) else {
            return Ok(HashSet::new());
        };

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT checksum FROM {table} WHERE {table} MATCH ?1"))?;
        let checksums = stmt
            .query_map([&expression], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()
            .with_context(|| format!("Search for {:?} failed", expression))?;

        debug!(
            "Search {} in {} index: {} hits",
            expression,
            self.kind,
            checksums.len()
        );
        Ok(checksums)
    }

    /// Number of indexed documents
    pub fn doc_count(&self) -> Result<i64> {
        let Some(table) = &self.table else {
            return Ok(0);
        };
        Ok(self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
    }

    /// Most informative terms of `text`, scored against the indexed collection
    ///
    /// Terms that do not occur in the index carry no information and are
    /// skipped.
    pub fn key_terms(&self, field: &str, text: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        self.check_field(field)?;
        let Some(table) = &self.table else {
            return Ok(Vec::new());
        };

        let docs = self.doc_count()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT cnt FROM {}_vocab WHERE term = ?1 AND col = ?2",
            table
        ))?;

        let mut scored = Vec::new();
        for (term, tf) in terms::term_frequencies(text) {
            let cf: Option<i64> = stmt
                .query_row(params![term, field], |row| row.get(0))
                .optional()?;
            match cf {
                Some(cf) if cf > 0 => {
                    let weight = terms::bo1_weight(tf, cf, docs);
                    scored.push((term, weight));
                }
                _ => {}
            }
        }

        Ok(terms::top_terms(scored, limit))
    }
}

impl Drop for IndexSearcher<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            warn!("Failed to close {} index searcher: {}", self.kind, e);
        }
    }
}
