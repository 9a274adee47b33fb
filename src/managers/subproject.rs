/*!
 * Subproject manager: access control and repository links.
 */

use anyhow::Result;

use crate::database::{DatabaseConnection, SubProjectRecord, User};
use crate::errors::LookupError;
use crate::query::{Condition, QuerySet};
use crate::util::{is_repo_link, parse_repo_link};

use super::ProjectManager;

#[derive(Clone)]
pub struct SubProjectManager {
    db: DatabaseConnection,
    projects: ProjectManager,
}

impl SubProjectManager {
    pub fn new(db: DatabaseConnection) -> Self {
        let projects = ProjectManager::new(db.clone());
        Self { db, projects }
    }

    pub fn all(&self) -> QuerySet<SubProjectRecord> {
        QuerySet::all(self.db.clone())
    }

    /// Subproject by project and subproject slug
    pub fn get(&self, project: &str, slug: &str) -> Result<SubProjectRecord, LookupError> {
        self.all()
            .filter(Condition::eq("p.slug", project.to_string()))
            .filter(Condition::eq("s.slug", slug.to_string()))
            .get()
    }

    /// Subprojects of projects the user is allowed to access
    pub fn all_acl(&self, user: &User) -> Result<QuerySet<SubProjectRecord>> {
        let accessible = self.projects.all_acl(user)?;
        if accessible.count()? == self.projects.all().count()? {
            return Ok(self.all());
        }
        Ok(self
            .all()
            .filter(Condition::InQuery("s.project_id", accessible.values("p.id"))))
    }

    /// Subproject a `weblate://project/subproject` repository points to
    ///
    /// Ordinary repository URLs yield `None`; a link to a missing
    /// subproject is a `DoesNotExist` error.
    pub fn get_linked(&self, val: &str) -> Result<Option<SubProjectRecord>, LookupError> {
        if !is_repo_link(val) {
            return Ok(None);
        }

        let (project, subproject) = parse_repo_link(val).ok_or_else(|| LookupError::DoesNotExist {
            entity: "SubProject",
            lookup: val.to_string(),
        })?;

        self.get(project, subproject).map(Some)
    }
}
