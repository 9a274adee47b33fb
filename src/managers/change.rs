/*!
 * Change history manager.
 */

use crate::database::models::ChangeAction;
use crate::database::{ChangeRecord, DatabaseConnection, TranslationRecord};
use crate::query::{Condition, QuerySet};

#[derive(Clone)]
pub struct ChangeManager {
    db: DatabaseConnection,
}

impl ChangeManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Whole history, newest first
    pub fn all(&self) -> QuerySet<ChangeRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Translation edits made by users
    pub fn content(&self) -> QuerySet<ChangeRecord> {
        self.all()
            .filter(Condition::is_in(
                "c.action",
                [ChangeAction::Change.code(), ChangeAction::New.code()],
            ))
            .exclude(Condition::IsNull("c.username"))
    }

    pub fn for_translation(&self, translation: &TranslationRecord) -> QuerySet<ChangeRecord> {
        self.all()
            .filter(Condition::eq("c.translation_id", translation.id))
    }
}
