//! SQLite module - the rusqlite implementation of `Backend`

use crate::core::db::backend::{
    Backend, BackendError, BackendResult, ConnectOptions, Credentials, ErrorInfo,
    ERRMODE_EXCEPTION, ERRMODE_OPTION, SQLSTATE_CONSTRAINT, SQLSTATE_GENERAL,
};
use crate::core::db::connection::Dsn;
use crate::core::db::params::{Bindings, BoundValue};
use crate::core::db::query::{Row, SqlValue};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, Statement, ToSql};
use std::time::Duration;
use tracing::debug;

/// Driver name accepted in the DSN
pub const SQLITE_DRIVER: &str = "sqlite";

/// Option key for the busy handler timeout, in milliseconds
pub const BUSY_TIMEOUT_OPTION: &str = "busy_timeout";

const STATEMENT_CACHE_CAPACITY: usize = 64;

static PRAGMA_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

impl ToSql for BoundValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            BoundValue::Integer(i) => ToSqlOutput::from(*i),
            BoundValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// A single SQLite connection.
///
/// `db_name` from the DSN is the database path; host and credentials are
/// accepted and ignored. Options other than `errmode` and `busy_timeout` are
/// applied as PRAGMAs.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
    dsn: String,
    errmode: String,
    last_error: Option<BackendError>,
}

impl SqliteBackend {
    /// Borrows the underlying rusqlite connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn track<T>(&mut self, result: rusqlite::Result<T>) -> BackendResult<T> {
        result.map_err(|e| {
            let err = to_backend_error(e);
            self.last_error = Some(err.clone());
            err
        })
    }
}

impl Backend for SqliteBackend {
    fn connect(dsn: &Dsn, credentials: &Credentials, options: &ConnectOptions) -> BackendResult<Self> {
        if !dsn.driver.eq_ignore_ascii_case(SQLITE_DRIVER) {
            return Err(BackendError::general(format!("could not find driver '{}'", dsn.driver)));
        }
        if credentials.user.is_some() {
            debug!("SQLite ignores connection credentials");
        }

        let conn = Connection::open(&dsn.db_name).map_err(to_backend_error)?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        let mut errmode = ERRMODE_EXCEPTION.to_string();
        for (key, value) in options {
            match key.as_str() {
                ERRMODE_OPTION => errmode = value.clone(),
                BUSY_TIMEOUT_OPTION => {
                    let millis: u64 = value.trim().parse().map_err(|_| {
                        BackendError::general(format!("invalid busy_timeout '{}'", value))
                    })?;
                    conn.busy_timeout(Duration::from_millis(millis))
                        .map_err(to_backend_error)?;
                }
                _ => {
                    if !PRAGMA_NAME.is_match(key) {
                        return Err(BackendError::general(format!("invalid option name '{}'", key)));
                    }
                    apply_pragma(&conn, key, value).map_err(to_backend_error)?;
                }
            }
        }

        Ok(SqliteBackend {
            conn,
            dsn: dsn.to_string(),
            errmode,
            last_error: None,
        })
    }

    fn prepare(&mut self, sql: &str) -> BackendResult<()> {
        let result = self.conn.prepare_cached(sql).map(|_| ());
        self.track(result)
    }

    fn check_placeholder(&mut self, sql: &str, placeholder: &str) -> BackendResult<()> {
        let result = find_placeholder(&self.conn, sql, placeholder);
        self.track(result)
    }

    fn execute(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<usize> {
        let result = execute_bound(&self.conn, sql, bindings);
        self.track(result)
    }

    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<Vec<Row>> {
        let result = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| collect_rows(&mut stmt, bindings, None));
        self.track(result)
    }

    fn query_all(&mut self, sql: &str) -> BackendResult<Vec<Row>> {
        let result = self
            .conn
            .prepare(sql)
            .and_then(|mut stmt| collect_rows(&mut stmt, &Bindings::new(), None));
        self.track(result)
    }

    fn fetch_one(&mut self, sql: &str) -> BackendResult<Option<Row>> {
        let result = self
            .conn
            .prepare(sql)
            .and_then(|mut stmt| collect_rows(&mut stmt, &Bindings::new(), Some(1)))
            .map(|rows| rows.into_iter().next());
        self.track(result)
    }

    fn begin_transaction(&mut self) -> BackendResult<()> {
        let result = self.conn.execute_batch("BEGIN");
        self.track(result)
    }

    fn commit(&mut self) -> BackendResult<()> {
        let result = self.conn.execute_batch("COMMIT");
        self.track(result)
    }

    fn roll_back(&mut self) -> BackendResult<()> {
        let result = self.conn.execute_batch("ROLLBACK");
        self.track(result)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "driver_name" => Some(SQLITE_DRIVER.to_string()),
            "server_version" | "client_version" => Some(rusqlite::version().to_string()),
            ERRMODE_OPTION => Some(self.errmode.clone()),
            "autocommit" => Some(if self.conn.is_autocommit() { "1" } else { "0" }.to_string()),
            "dsn" => Some(self.dsn.clone()),
            _ if PRAGMA_NAME.is_match(key) => self
                .conn
                .pragma_query_value(None, key, |row| row.get_ref(0).map(sql_value))
                .ok()
                .map(|value| value.to_string()),
            _ => None,
        }
    }

    fn error_info(&self) -> ErrorInfo {
        self.last_error
            .as_ref()
            .map(ErrorInfo::from)
            .unwrap_or_default()
    }
}

fn apply_pragma(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    let sql = format!("PRAGMA {} = '{}'", key, value.replace('\'', "''"));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    // Some pragmas (journal_mode) report their new value as a row.
    while rows.next()?.is_some() {}
    Ok(())
}

fn find_placeholder(conn: &Connection, sql: &str, placeholder: &str) -> rusqlite::Result<()> {
    let stmt = conn.prepare_cached(sql)?;
    match stmt.parameter_index(placeholder)? {
        Some(_) => Ok(()),
        None => Err(rusqlite::Error::InvalidParameterName(placeholder.to_string())),
    }
}

fn named_params(bindings: &Bindings) -> Vec<(&str, &dyn ToSql)> {
    bindings
        .iter()
        .map(|(placeholder, value)| (placeholder, value as &dyn ToSql))
        .collect()
}

/// Runs a statement for its side effects, discarding any rows it produces
/// (`RETURNING`, CTEs, pragmas).
fn execute_bound(conn: &Connection, sql: &str, bindings: &Bindings) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(sql)?;
    let readonly = stmt.readonly();
    let params = named_params(bindings);
    let mut rows = stmt.query(params.as_slice())?;
    while rows.next()?.is_some() {}
    drop(rows);

    // changes() still holds the count of an earlier write after a read-only statement
    if readonly {
        Ok(0)
    } else {
        Ok(conn.changes() as usize)
    }
}

fn collect_rows(stmt: &mut Statement<'_>, bindings: &Bindings, limit: Option<usize>) -> rusqlite::Result<Vec<Row>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let params = named_params(bindings);
    let mut rows = stmt.query(params.as_slice())?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(sql_value))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(Row::new(columns.clone(), values));
        if limit.map_or(false, |limit| out.len() >= limit) {
            break;
        }
    }
    Ok(out)
}

fn sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

fn to_backend_error(err: rusqlite::Error) -> BackendError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let sqlstate = if failure.code == ErrorCode::ConstraintViolation {
                SQLSTATE_CONSTRAINT
            } else {
                SQLSTATE_GENERAL
            };
            BackendError::new(
                sqlstate,
                Some(failure.extended_code),
                message.clone().unwrap_or_else(|| failure.to_string()),
            )
        }
        _ => BackendError::general(err.to_string()),
    }
}
