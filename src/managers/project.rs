/*!
 * Project manager.
 */

use anyhow::Result;
use log::debug;

use crate::database::{DatabaseConnection, ProjectRecord, User};
use crate::errors::LookupError;
use crate::query::{Condition, QuerySet};

#[derive(Clone)]
pub struct ProjectManager {
    db: DatabaseConnection,
}

impl ProjectManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn all(&self) -> QuerySet<ProjectRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Project by slug
    pub fn get_by_slug(&self, slug: &str) -> Result<ProjectRecord, LookupError> {
        self.all()
            .filter(Condition::eq("p.slug", slug.to_string()))
            .get()
    }

    /// Projects the user is allowed to access
    ///
    /// When every project passes the check the unrestricted set is returned,
    /// so callers do not pay for a useless `IN (...)` clause.
    pub fn all_acl(&self, user: &User) -> Result<QuerySet<ProjectRecord>> {
        let projects = self.all().fetch()?;
        let allowed: Vec<i64> = projects
            .iter()
            .filter(|project| project.has_acl(user))
            .map(|project| project.id)
            .collect();

        if allowed.len() == projects.len() {
            return Ok(self.all());
        }

        debug!(
            "User {:?} can access {} of {} projects",
            user.username,
            allowed.len(),
            projects.len()
        );
        Ok(self.all().filter(Condition::is_in("p.id", allowed)))
    }
}
