//! Domain-level error types.

use thiserror::Error;

/// Errors produced below the `FunctionsTable` surface.
///
/// The public table operations collapse these into `None` / `false`; they
/// are kept typed so the cause can be logged.
#[derive(Debug, Error)]
pub enum FunctionsError {
    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// A stored JSON document did not match the expected shape.
    #[error("malformed stored document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The Users collaborator has no user with this id.
    #[error("user '{0}' not found")]
    UserNotFound(String),

    /// The Users collaborator failed for a reason of its own.
    #[error("user store error: {0}")]
    UserStore(String),
}
