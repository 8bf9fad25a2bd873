//! Error types for garbage collection runs.

use crate::hash::ObjectHash;
use thiserror::Error;

/// Hard failures of a collection run.
///
/// A missing catalog or history database is *not* an error: the fetcher
/// reports it as `Ok(None)` and the collector records a skip. Everything in
/// this enum aborts the run.
#[derive(Error, Debug)]
pub enum GcError {
    /// Invalid hex digest string.
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    /// A storage path could not be mapped back to an object hash.
    #[error("invalid storage path: {0}")]
    InvalidStoragePath(String),

    /// An object was retrieved but failed structural or integrity checks.
    #[error("corrupt object {hash}: {reason}")]
    Corrupt {
        /// Hash of the damaged object.
        hash: ObjectHash,
        /// Description of the damage.
        reason: String,
    },

    /// The object store backend failed outside of a plain miss.
    #[error("object store error: {0}")]
    Store(String),

    /// The reflog could not be read or updated.
    #[error("reflog error: {0}")]
    Reflog(String),

    /// Delete requests failed; reported after all outstanding deletes drained.
    #[error("{0} delete request(s) failed")]
    UploaderErrors(u64),

    /// I/O error, e.g. while writing the deletion log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for collector operations.
pub type Result<T> = std::result::Result<T, GcError>;
