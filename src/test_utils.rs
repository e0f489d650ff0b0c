/// # Test Utilities Module
///
/// Shared fixtures for the unit tests:
/// - `RecordingBackend`, a scripted `Backend` that records every call
/// - `DatabaseFixture`, an in-memory SQLite facade with a small schema

use crate::core::db::backend::{
    Backend, BackendError, BackendResult, ConnectOptions, Credentials, ErrorInfo, ERRMODE_OPTION,
};
use crate::core::db::connection::{ConnectionConfig, Dsn};
use crate::core::db::params::Bindings;
use crate::core::db::query::Row;
use crate::core::Result;
use crate::database::Database;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:@$][A-Za-z_][A-Za-z0-9_]*").unwrap());

/// One call made against a `RecordingBackend`
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Prepare(String),
    CheckPlaceholder { sql: String, placeholder: String },
    Execute { sql: String, bindings: Bindings },
    FetchAll { sql: String, bindings: Bindings },
    QueryAll(String),
    FetchOne(String),
    Begin,
    Commit,
    RollBack,
}

/// A backend that never touches a database.
///
/// Reads return the rows configured with `set_rows`; failures are injected
/// per operation. Connecting with the option `fail_connect` fails.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    dsn: String,
    options: ConnectOptions,
    in_transaction: bool,
    rows: Vec<Row>,
    rows_affected: usize,
    prepare_error: Option<BackendError>,
    execute_error: Option<BackendError>,
    commit_fails: bool,
    last_error: Option<BackendError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.clone()
    }

    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    pub fn set_rows_affected(&mut self, rows_affected: usize) {
        self.rows_affected = rows_affected;
    }

    pub fn fail_prepare(&mut self, err: BackendError) {
        self.prepare_error = Some(err);
    }

    pub fn fail_execute(&mut self, err: BackendError) {
        self.execute_error = Some(err);
    }

    pub fn fail_commit(&mut self) {
        self.commit_fails = true;
    }

    /// Bindings of the most recent `execute` call
    pub fn last_execute(&self) -> Option<Bindings> {
        self.calls.iter().rev().find_map(|call| match call {
            BackendCall::Execute { bindings, .. } => Some(bindings.clone()),
            _ => None,
        })
    }

    /// SQL of the most recent `execute` call
    pub fn last_execute_sql(&self) -> Option<String> {
        self.calls.iter().rev().find_map(|call| match call {
            BackendCall::Execute { sql, .. } => Some(sql.clone()),
            _ => None,
        })
    }

    fn fail<T>(&mut self, err: BackendError) -> BackendResult<T> {
        self.last_error = Some(err.clone());
        Err(err)
    }
}

impl Backend for RecordingBackend {
    fn connect(dsn: &Dsn, _credentials: &Credentials, options: &ConnectOptions) -> BackendResult<Self> {
        if options.contains_key("fail_connect") {
            return Err(BackendError::general("unable to open database file"));
        }
        Ok(RecordingBackend {
            dsn: dsn.to_string(),
            options: options.clone(),
            ..Default::default()
        })
    }

    fn prepare(&mut self, sql: &str) -> BackendResult<()> {
        self.calls.push(BackendCall::Prepare(sql.to_string()));
        match self.prepare_error.clone() {
            Some(err) => self.fail(err),
            None => Ok(()),
        }
    }

    fn check_placeholder(&mut self, sql: &str, placeholder: &str) -> BackendResult<()> {
        self.calls.push(BackendCall::CheckPlaceholder {
            sql: sql.to_string(),
            placeholder: placeholder.to_string(),
        });
        if PLACEHOLDER.find_iter(sql).any(|m| m.as_str() == placeholder) {
            Ok(())
        } else {
            self.fail(BackendError::general(format!("Invalid parameter name: {}", placeholder)))
        }
    }

    fn execute(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<usize> {
        self.calls.push(BackendCall::Execute {
            sql: sql.to_string(),
            bindings: bindings.clone(),
        });
        match self.execute_error.clone() {
            Some(err) => self.fail(err),
            None => Ok(self.rows_affected),
        }
    }

    fn fetch_all(&mut self, sql: &str, bindings: &Bindings) -> BackendResult<Vec<Row>> {
        self.calls.push(BackendCall::FetchAll {
            sql: sql.to_string(),
            bindings: bindings.clone(),
        });
        match self.execute_error.clone() {
            Some(err) => self.fail(err),
            None => Ok(self.rows.clone()),
        }
    }

    fn query_all(&mut self, sql: &str) -> BackendResult<Vec<Row>> {
        self.calls.push(BackendCall::QueryAll(sql.to_string()));
        match self.execute_error.clone() {
            Some(err) => self.fail(err),
            None => Ok(self.rows.clone()),
        }
    }

    fn fetch_one(&mut self, sql: &str) -> BackendResult<Option<Row>> {
        self.calls.push(BackendCall::FetchOne(sql.to_string()));
        match self.execute_error.clone() {
            Some(err) => self.fail(err),
            None => Ok(self.rows.first().cloned()),
        }
    }

    fn begin_transaction(&mut self) -> BackendResult<()> {
        self.calls.push(BackendCall::Begin);
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.calls.push(BackendCall::Commit);
        if self.commit_fails {
            return self.fail(BackendError::general("database is locked"));
        }
        self.in_transaction = false;
        Ok(())
    }

    fn roll_back(&mut self) -> BackendResult<()> {
        self.calls.push(BackendCall::RollBack);
        self.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn last_insert_id(&self) -> i64 {
        0
    }

    fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "dsn" => Some(self.dsn.clone()),
            ERRMODE_OPTION => self.options.get(ERRMODE_OPTION).cloned(),
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

/// In-memory SQLite facade with a `users` table
pub struct DatabaseFixture {
    pub db: Database,
}

impl DatabaseFixture {
    pub fn new() -> Result<Self> {
        let config = ConnectionConfig::sqlite(":memory:").with_option("foreign_keys", "ON");
        let mut db = Database::open(&config)?;
        db.prepare_statement(
            "schema",
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, age INTEGER)",
        )?;
        db.exec("schema")?;
        Ok(DatabaseFixture { db })
    }

    /// Adds users through a prepared insert
    pub fn with_users(names: &[&str]) -> Result<Self> {
        let mut fixture = Self::new()?;
        fixture
            .db
            .prepare_statement("fixture_insert", "INSERT INTO users (name) VALUES (:name)")?;
        for name in names {
            fixture
                .db
                .set_params("fixture_insert", [("name", *name)])?
                .exec("fixture_insert")?;
        }
        Ok(fixture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::query::SqlValue;
    use crate::core::SqlGateError;

    #[test]
    fn test_fixture_round_trip() {
        let mut fixture = DatabaseFixture::with_users(&["alice", "bob"]).unwrap();
        fixture
            .db
            .prepare_statement("names", "SELECT name FROM users ORDER BY id")
            .unwrap();
        let rows = fixture.db.exec("names").unwrap().into_rows().unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.get("name").cloned()).collect();
        assert_eq!(
            names,
            vec![
                Some(SqlValue::Text("alice".to_string())),
                Some(SqlValue::Text("bob".to_string()))
            ]
        );
    }

    #[test]
    fn test_duplicate_user_rolls_back() {
        let mut fixture = DatabaseFixture::with_users(&["alice"]).unwrap();
        let db = &mut fixture.db;
        let err = db
            .set_params("fixture_insert", [("name", "alice")])
            .unwrap()
            .exec("fixture_insert")
            .unwrap_err();
        assert!(matches!(err, SqlGateError::Connection { .. }));
        assert!(!db.in_transaction());
        assert_eq!(db.error_code(), "23000");
    }

    #[test]
    fn test_recording_backend_placeholders() {
        let mut backend = RecordingBackend::new();
        let sql = "UPDATE t SET a = :a WHERE id = @id";
        assert!(backend.check_placeholder(sql, ":a").is_ok());
        assert!(backend.check_placeholder(sql, "@id").is_ok());
        assert!(backend.check_placeholder(sql, ":id").is_err());
        assert!(backend.check_placeholder(sql, ":ab").is_err());
    }
}
