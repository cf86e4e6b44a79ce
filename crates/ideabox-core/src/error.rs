//! Error types for the Ideabox system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdeaboxError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflicting {entity}: {message}")]
    Conflict { entity: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl IdeaboxError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IdeaboxError::NotFound { .. })
    }
}

pub type IdeaboxResult<T> = Result<T, IdeaboxError>;
