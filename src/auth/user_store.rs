//! User storage keyed by external subject.

use anyhow::{Result, anyhow};
use surrealdb::RecordId;

use crate::db::{Db, UserRecord};
use crate::types::SubjectId;

/// User store for database operations.
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Find the user for an external subject, creating it on first sight.
    ///
    /// This is a single `UPSERT` on a record id derived from the subject, so
    /// concurrent first requests for the same subject settle on one record
    /// instead of racing a lookup against an insert. The write completes
    /// before this returns; `last_seen_at` is refreshed on every call.
    pub async fn find_or_create(&self, subject: &SubjectId) -> Result<UserRecord> {
        let subject = subject.as_str().to_string();

        let query = r#"
            UPSERT type::thing('user', $subject) SET
                subject = $subject,
                last_seen_at = time::now()
        "#;

        let mut res = self.db.query(query).bind(("subject", subject)).await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("user upsert returned no record"))
    }

    /// Get a user by external subject.
    pub async fn get_by_subject(&self, subject: &SubjectId) -> Result<Option<UserRecord>> {
        let subject = subject.as_str().to_string();

        let query = "SELECT * FROM user WHERE subject = $subject LIMIT 1";

        let mut res = self.db.query(query).bind(("subject", subject)).await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Get a user by internal database id.
    pub async fn get_by_id(&self, user_id: &RecordId) -> Result<Option<UserRecord>> {
        let query = "SELECT * FROM user WHERE id = $id LIMIT 1";

        let mut res = self.db.query(query).bind(("id", user_id.clone())).await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }
}
