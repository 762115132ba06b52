//! Shared error type for the domain workflow modules.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("{field}: {message}")]
    Validation { field: String, message: String },
}

impl WorkflowError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
