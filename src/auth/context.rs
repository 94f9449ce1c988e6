//! Request-scoped identity attached after verification.

use surrealdb::RecordId;

use crate::types::SubjectId;

/// Authenticated user for the current request.
///
/// Inserted into the request extensions by the auth middleware and read by
/// handlers with `Extension<CurrentUser>`. Immutable once created; dropped
/// when the response completes.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user_id: RecordId,
    subject: SubjectId,
}

impl CurrentUser {
    /// Create a new request context.
    pub fn new(user_id: RecordId, subject: SubjectId) -> Self {
        Self { user_id, subject }
    }

    /// Internal database identifier of the user.
    pub fn user_id(&self) -> &RecordId {
        &self.user_id
    }

    /// External subject identifier the user authenticated with.
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }
}
