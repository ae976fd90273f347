//! Error types for the store layer.

use thiserror::Error;

/// Errors surfaced by a document-store driver.
///
/// `NotFound` is part of normal control flow (a missing document, or an
/// update whose target no longer exists); every other variant is fatal to
/// the operation in progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("driver error: {0}")]
    Driver(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
