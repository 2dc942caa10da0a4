//! Error taxonomy for ledger handling, connector lookups and integrations
//!
//! Only [`LedgerError`] is fatal to a run. [`IntegrationError`] and
//! [`RegistryError`] are caught at the driver's column boundary and reported
//! as that column's outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting the identity ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The file has no header row or no row-key column
    #[error("malformed ledger {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// The file could not be read or parsed as CSV
    #[error("failed to read ledger {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The ledger could not be written back
    #[error("failed to write ledger {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from the connector registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A connector was registered twice under the same slug
    #[error("integration '{0}' is already registered")]
    DuplicateSlug(String),

    /// The slug is empty or contains the column key delimiter
    #[error("invalid integration slug '{0}'")]
    InvalidSlug(String),

    /// No connector is registered under this slug
    #[error("unknown integration '{0}'")]
    UnknownIntegration(String),
}

/// Errors from interactive operator input
#[derive(Debug, Error)]
pub enum PromptError {
    /// Reading from the terminal failed
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The operator aborted the prompt or gave no usable answer
    #[error("no answer given for '{0}'")]
    NoAnswer(String),
}

/// Errors raised by a connector while talking to its external system
///
/// `Auth` is the authentication/authorization subset: the external system
/// rejected the supplied credentials or the caller lacks permission.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Credentials were rejected or the caller is not permitted
    #[error("{0}")]
    Auth(String),

    /// The external system answered with a shape we do not understand
    #[error("Unexpected response from {system}! {message}")]
    UnexpectedResponse { system: String, message: String },

    /// The external system could not be reached or returned a failure status
    #[error("{system} connection issue! {message}")]
    Connection { system: String, message: String },

    /// Operator input needed by the connector could not be read
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl IntegrationError {
    /// Build an authentication error with an operator-facing message
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Build an error for a response missing expected fields
    pub fn unexpected(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            system: system.into(),
            message: message.into(),
        }
    }

    /// Build an error for a transport failure or non-success status
    pub fn connection(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            system: system.into(),
            message: message.into(),
        }
    }

    /// Whether this error is an authentication rejection
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Result type for connector operations
pub type IntegrationResult<T> = Result<T, IntegrationError>;
