use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, sql::Datetime};

/// Persisted user record, provisioned lazily on the first authenticated
/// request for a previously unseen subject.
///
/// Records are never deleted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Internal database identifier (table: `user`).
    pub id: RecordId,
    /// External subject identifier from the identity provider (`sub` claim).
    pub subject: String,
    /// When this record was first created.
    pub created_at: Option<Datetime>,
    /// When this record was last written.
    pub updated_at: Option<Datetime>,
    /// Last authenticated request from this user.
    pub last_seen_at: Option<Datetime>,
}
