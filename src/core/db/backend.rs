//! Backend module - the driver seam the facade orchestrates
//!
//! The facade never talks to a database directly. Everything it needs from a
//! driver is listed on [`Backend`]; [`SqliteBackend`](super::SqliteBackend) is
//! the implementation shipped with the crate.

use crate::core::db::connection::Dsn;
use crate::core::db::params::Bindings;
use crate::core::db::query::Row;
use std::collections::BTreeMap;
use std::fmt;

/// SQLSTATE reported when no backend call has failed yet
pub const SQLSTATE_OK: &str = "00000";

/// SQLSTATE for general driver errors
pub const SQLSTATE_GENERAL: &str = "HY000";

/// SQLSTATE for integrity constraint violations
pub const SQLSTATE_CONSTRAINT: &str = "23000";

/// Option key recording how the driver reports errors
pub const ERRMODE_OPTION: &str = "errmode";

/// The only error mode the facade supports: every failure is returned as an error
pub const ERRMODE_EXCEPTION: &str = "exception";

/// A failure reported by the driver, with its native diagnostics.
///
/// This type never leaves the crate's error path: the facade logs it and keeps
/// it for `error_info`, then returns a generic connection error.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    /// SQLSTATE-style code
    pub sqlstate: String,
    /// Driver-specific numeric code, if the driver has one
    pub driver_code: Option<i32>,
    /// Driver message
    pub message: String,
}

impl BackendError {
    pub fn new(sqlstate: impl Into<String>, driver_code: Option<i32>, message: impl Into<String>) -> Self {
        BackendError {
            sqlstate: sqlstate.into(),
            driver_code,
            message: message.into(),
        }
    }

    /// A general error with no driver code
    pub fn general(message: impl Into<String>) -> Self {
        BackendError::new(SQLSTATE_GENERAL, None, message)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.driver_code {
            Some(code) => write!(f, "SQLSTATE[{}] ({}): {}", self.sqlstate, code, self.message),
            None => write!(f, "SQLSTATE[{}]: {}", self.sqlstate, self.message),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Diagnostic snapshot of the last backend failure
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ErrorInfo {
    pub sqlstate: String,
    pub driver_code: Option<i32>,
    pub message: Option<String>,
}

impl Default for ErrorInfo {
    fn default() -> Self {
        ErrorInfo {
            sqlstate: SQLSTATE_OK.to_string(),
            driver_code: None,
            message: None,
        }
    }
}

impl From<&BackendError> for ErrorInfo {
    fn from(err: &BackendError) -> Self {
        ErrorInfo {
            sqlstate: err.sqlstate.clone(),
            driver_code: err.driver_code,
            message: Some(err.message.clone()),
        }
    }
}

/// User name and password handed to the driver at connect time
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Backend-specific connection options, in key order
pub type ConnectOptions = BTreeMap<String, String>;

/// The operations the facade consumes from a database driver.
///
/// Statements are addressed by their SQL text; implementations are expected to
/// cache compiled statements so that `prepare` followed by `execute` with the
/// same text does not recompile.
pub trait Backend {
    /// Opens a connection described by `dsn`
    fn connect(dsn: &Dsn, credentials: &Credentials, options: &ConnectOptions) -> BackendResult<Self>
    where
        Self: Sized;

    /// Compiles `sql`, rejecting it if the driver cannot
    fn prepare(&mut self, sql: &str) -> BackendResult<()>;

    /// Checks that the compiled `sql` has a slot named `placeholder`
    fn check_placeholder(&mut self, sql: &str, placeholder: &str) -> BackendResult<()>;

    /// Runs a statement for its side effects; yields the number of rows
    /// affected. Rows the statement produces are discarded.
    fn execute(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<usize>;

    /// Runs a prepared statement and collects every row
    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<Vec<Row>>;

    /// Runs an unparameterized, uncached statement and collects every row
    fn query_all(&mut self, sql: &str) -> BackendResult<Vec<Row>>;

    /// Runs an unparameterized, uncached statement and returns its first row, if any
    fn fetch_one(&mut self, sql: &str) -> BackendResult<Option<Row>>;

    fn begin_transaction(&mut self) -> BackendResult<()>;

    fn commit(&mut self) -> BackendResult<()>;

    fn roll_back(&mut self) -> BackendResult<()>;

    fn in_transaction(&self) -> bool;

    /// Row id of the most recent successful insert
    fn last_insert_id(&self) -> i64;

    /// Reads a connection attribute by name
    fn attribute(&self, key: &str) -> Option<String>;

    /// Diagnostics for the most recent failed call
    fn error_info(&self) -> ErrorInfo;
}
