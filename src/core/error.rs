/// sqlgate Error Module
///
/// This module defines the error type returned by every fallible operation of
/// the facade. Backend failures are deliberately collapsed into a single
/// generic variant; the driver's own diagnostics are logged and kept on the
/// backend for `error_code` / `error_info`.
use crate::core::db::query::QueryKind;
use thiserror::Error;

/// Error type for the sqlgate facade.
///
/// The variants map onto the failure classes a caller can act on:
/// - bad configuration or a missing statement name at registration
/// - a backend failure of any kind (connect, prepare, bind, execute, commit)
/// - a statement name that was never registered
/// - an ad-hoc query whose leading verb is not the requested one
/// - a prepared select that matched nothing
#[derive(Error, Debug)]
pub enum SqlGateError {
    /// Missing required connection fields, empty statement names and
    /// unreadable configuration files
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any backend failure. Carries only the operation that failed, never the
    /// driver's message.
    #[error("database connection error during {operation}")]
    Connection { operation: &'static str },

    /// Statement name that has not been registered with `prepare_statement`
    #[error("Statement not found: '{0}'")]
    NotFound(String),

    /// Leading SQL verb did not match the requested query kind
    #[error("Invalid query: expected a {expected} statement")]
    InvalidQuery { expected: QueryKind },

    /// A prepared select executed through `exec` returned no rows
    #[error("Empty result: statement '{0}' returned no rows")]
    EmptyResult(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlGateError {
    pub(crate) fn connection(operation: &'static str) -> Self {
        SqlGateError::Connection { operation }
    }
}

/// Type alias for Result to use SqlGateError as the error type.
pub type Result<T> = std::result::Result<T, SqlGateError>;
