use thiserror::Error;

use crate::model::{EntityKind, Identifier};

/// Failures of the identifier registry and generator.
#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("Prefix: '{0}' is unknown to cerebrum")]
    UnknownKind(String),

    #[error("{0} is an invalid uuid")]
    Invalid(String),

    #[error("Error in generating secure random number for uuid: {0}")]
    EntropyUnavailable(String),
}

/// Failures while parsing or applying a JSON Patch document.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("malformed json patch: {0}")]
    Malformed(String),

    #[error("json patch could not be applied: {0}")]
    Application(String),

    #[error("patched document could not be read back: {0}")]
    Rehydrate(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Validation failed for request")]
    Validation(Vec<String>),

    #[error("{0} is an invalid uuid")]
    InvalidIdentifier(String),

    #[error("Could not find {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Identifier(IdentifierError),

    #[error("Full authentication is required to access this resource: {0}")]
    Unauthorized(String),

    #[error("Access is denied: {0}")]
    Forbidden(String),

    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(vec![message.into()])
    }
}

impl From<IdentifierError> for CatalogError {
    fn from(err: IdentifierError) -> Self {
        match err {
            IdentifierError::Invalid(id) => CatalogError::InvalidIdentifier(id),
            other => CatalogError::Identifier(other),
        }
    }
}

/// A store refused to bind an identifier to a second entity kind.
#[derive(Debug, Error)]
#[error("uuid: {id} is already used by a {}", .existing.label())]
pub struct KindConflict {
    pub id: Identifier,
    pub existing: EntityKind,
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<KindConflict>() {
            Some(conflict) => CatalogError::validation(conflict.to_string()),
            None => CatalogError::Store(err),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
