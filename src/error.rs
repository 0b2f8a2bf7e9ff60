//! Error types for accessibility checks

use crate::report::ViolationReport;
use thiserror::Error;

/// Result type alias for check operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running accessibility checks
#[derive(Error, Debug)]
pub enum Error {
    /// One or more accessibility violations were found
    #[error("{0}")]
    Violations(ViolationReport),

    /// The serialization token was not acquired within its deadline
    #[error("Timed out after {0}ms waiting for the check lock")]
    LockTimeout(u64),

    /// The serialization token was cancelled (test ended)
    #[error("Check lock cancelled")]
    LockCancelled,

    /// The rule engine failed for a reason other than finding violations
    #[error("Rule engine failure: {0}")]
    Engine(String),

    /// Lifecycle hook failure (watcher task lost, harness misuse)
    #[error("Harness error: {0}")]
    Harness(String),

    /// Document mutation addressed a node that does not exist
    #[error("Document error: {0}")]
    Dom(String),
}

impl Error {
    /// Borrow the embedded report when this error carries violations
    pub fn report(&self) -> Option<&ViolationReport> {
        match self {
            Error::Violations(report) => Some(report),
            _ => None,
        }
    }
}

// External engine adapters typically surface anyhow errors
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Engine(err.to_string())
    }
}
