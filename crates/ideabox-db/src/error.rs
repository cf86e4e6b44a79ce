//! Database-specific error types and conversions.

use ideabox_core::error::IdeaboxError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}: {message}")]
    Conflict { entity: String, message: String },
}

impl DbError {
    /// Classify a failed write. Unique index violations become
    /// [`DbError::Conflict`]; everything else stays a storage error.
    pub(crate) fn from_write(err: surrealdb::Error, entity: &str) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.into(),
                message,
            }
        } else {
            DbError::Surreal(err)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for IdeaboxError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => IdeaboxError::NotFound { entity, id },
            DbError::Conflict { entity, message } => IdeaboxError::Conflict { entity, message },
            other => IdeaboxError::Database(other.to_string()),
        }
    }
}
