//! Typed store errors.
//!
//! Callers must be able to tell "no such row" and "a row already exists"
//! apart from an unreachable database, so these are separate variants
//! instead of a logged boolean.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert collided with an existing unique key (photo path or tag name).
    #[error("a record with path `{path}` already exists")]
    AlreadyExists { path: String },

    /// The referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem failure while opening the database.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn photo_not_found(id: i64) -> Self {
        StoreError::NotFound { entity: "photo", id }
    }

    pub fn tag_not_found(id: i64) -> Self {
        StoreError::NotFound { entity: "tag", id }
    }

    /// True when an insert failed because of a UNIQUE constraint.
    pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
