//! Crate-wide error taxonomy.

use thiserror::Error;

use crate::store::StoreError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ArqoError>;

/// Error taxonomy for compilation, provisioning and store round-trips.
#[derive(Debug, Error)]
pub enum ArqoError {
    /// Malformed criteria. Carries the offending field path so callers can
    /// locate the bad leaf without re-parsing their own input.
    #[error("invalid criteria at `{path}`: {reason}")]
    Validation {
        /// Dotted field path of the offending criteria leaf.
        path: String,
        /// What was malformed.
        reason: String,
    },
    /// Internal contract violation while assembling or serializing a query
    /// program. Should not occur for criteria that passed validation.
    #[error("query compilation failed: {0}")]
    Compilation(String),
    /// Transport or query execution failure, with the store's native payload
    /// passed through unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Collection/edge/graph provisioning failure. Fatal to connection setup.
    #[error("schema sync failed at stage `{stage}`: {source}")]
    SchemaSync {
        /// Pipeline stage that failed.
        stage: &'static str,
        /// Underlying store failure.
        source: StoreError,
    },
    /// The logical model itself is inconsistent (duplicate primary-key alias,
    /// relation pointing at an undeclared collection).
    #[error("invalid logical model: {0}")]
    Model(String),
}

impl ArqoError {
    /// Shorthand for [`ArqoError::Validation`] with owned parts.
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
