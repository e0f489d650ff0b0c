//! The `Database` facade
//!
//! One connection, a registry of named prepared statements, and two ways to
//! run SQL:
//!
//! - `exec` runs a registered statement inside its own transaction
//!   (begin, execute, commit; rollback on failure).
//! - `select` / `insert` / `update` / `delete` run ad-hoc SQL directly against
//!   the connection after checking its leading verb. These are NOT wrapped in
//!   a transaction.
//!
//! Every backend failure is logged with its native detail and returned as the
//! generic `SqlGateError::Connection`. The detail stays readable through
//! `error_code` and `error_info`.

use crate::core::db::backend::{Backend, BackendError, ErrorInfo};
use crate::core::db::connection::{ConnectionConfig, Dsn};
use crate::core::db::params::{normalize_placeholder, BoundValue, ParamValue};
use crate::core::db::query::{validate, QueryKind, Row};
use crate::core::db::sqlite::SqliteBackend;
use crate::core::db::statement::{check_name, NamedStatement, StatementRegistry};
use crate::core::{Result, SqlGateError};
use tracing::{debug, info, warn};

/// Result of a write executed through `exec`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WriteOutcome {
    /// Always true: a failed write is returned as an error instead
    pub success: bool,
    pub rows_affected: usize,
    /// Row id of the most recent insert on this connection
    pub last_insert_id: i64,
}

/// What `exec` returns: rows for a select, a write outcome for anything else
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ExecOutcome {
    Rows(Vec<Row>),
    Written(WriteOutcome),
}

impl ExecOutcome {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            ExecOutcome::Written(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            ExecOutcome::Rows(rows) => Some(rows),
            ExecOutcome::Written(_) => None,
        }
    }

    pub fn written(&self) -> Option<&WriteOutcome> {
        match self {
            ExecOutcome::Written(outcome) => Some(outcome),
            ExecOutcome::Rows(_) => None,
        }
    }

    /// Truthiness of the outcome: a non-empty row set, or a successful write
    pub fn is_success(&self) -> bool {
        match self {
            ExecOutcome::Rows(rows) => !rows.is_empty(),
            ExecOutcome::Written(outcome) => outcome.success,
        }
    }
}

/// A single database connection with a registry of named prepared statements.
///
/// Intended for one logical caller at a time: every operation takes
/// `&mut self`. Share it across threads behind a `Mutex`, or open one per
/// worker.
#[derive(Debug)]
pub struct Database<B: Backend = SqliteBackend> {
    backend: B,
    statements: StatementRegistry,
}

impl Database<SqliteBackend> {
    /// Opens a connection through the bundled SQLite backend.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::Configuration` if driver, database name or host
    /// is missing, and `SqlGateError::Connection` if the connection cannot be
    /// opened.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlgate::{ConnectionConfig, Database};
    ///
    /// let mut db = Database::open(&ConnectionConfig::sqlite(":memory:")).unwrap();
    /// let row = db.select("SELECT 1 AS one").unwrap().unwrap();
    /// assert_eq!(row.get("one").unwrap().to_string(), "1");
    /// ```
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        Self::open_with(config)
    }
}

impl<B: Backend> Database<B> {
    /// Opens a connection through backend `B`
    pub fn open_with(config: &ConnectionConfig) -> Result<Self> {
        let dsn = Dsn::from_config(config)?;
        let backend = B::connect(&dsn, &config.credentials(), &config.connect_options())
            .map_err(|err| backend_failure("connect", &err))?;
        info!(%dsn, "Opened database connection");
        Ok(Database::from_backend(backend))
    }

    /// Wraps an already connected backend
    pub fn from_backend(backend: B) -> Self {
        Database {
            backend,
            statements: StatementRegistry::new(),
        }
    }

    /// Compiles `sql` and registers it under `name`, replacing any statement
    /// previously registered under that name.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::Configuration` for an empty name and
    /// `SqlGateError::Connection` if the backend rejects the SQL.
    pub fn prepare_statement(&mut self, name: &str, sql: &str) -> Result<&mut Self> {
        check_name(name)?;
        self.backend
            .prepare(sql)
            .map_err(|err| backend_failure("prepare", &err))?;
        self.statements.register(name, sql)?;
        debug!(statement = name, "Prepared statement");
        Ok(self)
    }

    /// Returns the statement registered under `name`
    pub fn statement(&self, name: &str) -> Result<&NamedStatement> {
        self.statements.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.statements.contains(name)
    }

    /// Binds parameters to the statement registered under `name`.
    ///
    /// Entries are bound in iteration order. Values whose string form is all
    /// digits, or that are otherwise numeric, bind as integers; everything
    /// else binds as text. Binding a placeholder again replaces its value.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::NotFound` if `name` is not registered and
    /// `SqlGateError::Connection` if the statement has no such placeholder.
    /// Entries before the rejected one stay bound.
    pub fn set_params<I, K, V>(&mut self, name: &str, params: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let backend = &mut self.backend;
        let statement = self.statements.get_mut(name)?;
        for (placeholder, value) in params {
            let placeholder = normalize_placeholder(placeholder.as_ref());
            backend
                .check_placeholder(statement.sql(), &placeholder)
                .map_err(|err| backend_failure("bind", &err))?;
            let value = BoundValue::classify(value.into());
            debug!(
                statement = name,
                %placeholder,
                integer = matches!(value, BoundValue::Integer(_)),
                "Bound parameter"
            );
            statement.bind(&placeholder, value);
        }
        Ok(self)
    }

    /// Runs the statement registered under `name` in its own transaction.
    ///
    /// A select returns every row it produced; anything else returns a
    /// [`WriteOutcome`]. On failure the transaction is rolled back before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - `SqlGateError::NotFound` if `name` is not registered
    /// - `SqlGateError::Connection` if begin, execute or commit fails
    /// - `SqlGateError::EmptyResult` if a select produced no rows
    pub fn exec(&mut self, name: &str) -> Result<ExecOutcome> {
        let backend = &mut self.backend;
        let statement = self.statements.get(name)?;
        debug!(statement = name, "Executing prepared statement");

        match run_in_transaction(backend, statement) {
            Ok(ExecOutcome::Rows(rows)) if rows.is_empty() => {
                Err(SqlGateError::EmptyResult(name.to_string()))
            }
            Ok(outcome) => Ok(outcome),
            Err((operation, err)) => {
                let error = backend_failure(operation, &err);
                if backend.in_transaction() {
                    match backend.roll_back() {
                        Ok(()) => debug!(statement = name, "Rolled back transaction"),
                        Err(rollback_err) => warn!(
                            statement = name,
                            detail = %rollback_err.message,
                            "Rollback failed"
                        ),
                    }
                }
                Err(error)
            }
        }
    }

    /// Runs an ad-hoc SELECT and returns its first row.
    ///
    /// Not transactional, unlike `exec`.
    pub fn select(&mut self, query: &str) -> Result<Option<Row>> {
        self.fetch_one_as(query, QueryKind::Select)
    }

    /// Runs an ad-hoc INSERT and returns its first row (only present with
    /// `RETURNING`).
    ///
    /// Not transactional, unlike `exec`.
    pub fn insert(&mut self, query: &str) -> Result<Option<Row>> {
        self.fetch_one_as(query, QueryKind::Insert)
    }

    /// Runs an ad-hoc UPDATE and returns its first row (only present with
    /// `RETURNING`).
    ///
    /// Not transactional, unlike `exec`.
    pub fn update(&mut self, query: &str) -> Result<Option<Row>> {
        self.fetch_one_as(query, QueryKind::Update)
    }

    /// Runs an ad-hoc DELETE and returns every row it produced (only present
    /// with `RETURNING`).
    ///
    /// Not transactional, unlike `exec`.
    pub fn delete(&mut self, query: &str) -> Result<Vec<Row>> {
        validate(query, QueryKind::Delete)?;
        debug!(kind = %QueryKind::Delete, "Running ad-hoc query");
        self.backend
            .query_all(query)
            .map_err(|err| backend_failure("query", &err))
    }

    fn fetch_one_as(&mut self, query: &str, kind: QueryKind) -> Result<Option<Row>> {
        validate(query, kind)?;
        debug!(%kind, "Running ad-hoc query");
        self.backend
            .fetch_one(query)
            .map_err(|err| backend_failure("query", &err))
    }

    /// Reads a backend configuration value such as `driver_name` or `errmode`
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.backend.attribute(key)
    }

    /// SQLSTATE of the last backend failure, `"00000"` if there was none
    pub fn error_code(&self) -> String {
        self.backend.error_info().sqlstate
    }

    /// Diagnostics for the last backend failure
    pub fn error_info(&self) -> ErrorInfo {
        self.backend.error_info()
    }

    pub fn in_transaction(&self) -> bool {
        self.backend.in_transaction()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct access to the backend. Statements registered on the facade are
    /// unaffected by anything done here.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Begin, execute, commit. On error, names the step that failed.
fn run_in_transaction<B: Backend>(
    backend: &mut B,
    statement: &NamedStatement,
) -> std::result::Result<ExecOutcome, (&'static str, BackendError)> {
    backend
        .begin_transaction()
        .map_err(|err| ("begin transaction", err))?;

    let outcome = if statement.is_select() {
        let rows = backend
            .fetch_all(statement.sql(), statement.bindings())
            .map_err(|err| ("execute", err))?;
        ExecOutcome::Rows(rows)
    } else {
        let rows_affected = backend
            .execute(statement.sql(), statement.bindings())
            .map_err(|err| ("execute", err))?;
        ExecOutcome::Written(WriteOutcome {
            success: true,
            rows_affected,
            last_insert_id: backend.last_insert_id(),
        })
    };

    if backend.in_transaction() {
        backend.commit().map_err(|err| ("commit", err))?;
    }
    Ok(outcome)
}

fn backend_failure(operation: &'static str, err: &BackendError) -> SqlGateError {
    warn!(
        operation,
        sqlstate = %err.sqlstate,
        driver_code = ?err.driver_code,
        detail = %err.message,
        "Backend call failed"
    );
    SqlGateError::connection(operation)
}
