/*!
 * Pending index updates.
 *
 * With offloaded indexing the unit manager does not touch the index. It
 * enqueues an `IndexUpdate` in the relational store and a separate consumer
 * (`UnitManager::process_index_queue`) applies the batch later. An update is
 * only removed from the queue once the consumer acknowledges it.
 */

use anyhow::Result;
use log::debug;
use rusqlite::params;

use crate::database::DatabaseConnection;

/// Request to (re)index one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexUpdate {
    /// Queue row ID
    pub id: i64,
    /// Unit to index
    pub unit_id: i64,
    /// Whether the source index needs updating as well
    pub source: bool,
}

/// Work queue of pending index updates
#[derive(Clone)]
pub struct IndexQueue {
    db: DatabaseConnection,
}

impl IndexQueue {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Queue a unit; already queued (unit, source) pairs are kept once
    pub fn enqueue(&self, unit_id: i64, source: bool) -> Result<()> {
        let inserted = self.db.execute(|conn| {
            Ok(conn.execute(
                "INSERT OR IGNORE INTO index_updates (unit_id, source) VALUES (?1, ?2)",
                params![unit_id, source],
            )?)
        })?;

        if inserted == 0 {
            debug!("Index update for unit {} already queued", unit_id);
        }
        Ok(())
    }

    /// Number of queued updates
    pub fn pending(&self) -> Result<usize> {
        self.db.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM index_updates", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Oldest queued updates, without removing them
    pub fn take(&self, limit: usize) -> Result<Vec<IndexUpdate>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, unit_id, source FROM index_updates ORDER BY id LIMIT ?1",
            )?;
            let updates = stmt
                .query_map([limit as i64], |row| {
                    Ok(IndexUpdate {
                        id: row.get(0)?,
                        unit_id: row.get(1)?,
                        source: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(updates)
        })
    }

    /// Remove processed updates from the queue
    pub fn acknowledge(&self, updates: &[IndexUpdate]) -> Result<()> {
        self.db.transaction(|tx| {
            let mut stmt = tx.prepare("DELETE FROM index_updates WHERE id = ?1")?;
            for update in updates {
                stmt.execute([update.id])?;
            }
            Ok(())
        })
    }
}
