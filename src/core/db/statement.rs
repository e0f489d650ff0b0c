//! Statement module - the registry of named prepared statements

use crate::core::db::params::{normalize_placeholder, Bindings, BoundValue};
use crate::core::db::query::QueryKind;
use crate::core::{Result, SqlGateError};
use std::collections::HashMap;

/// A prepared statement registered under a caller-chosen name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedStatement {
    name: String,
    sql: String,
    bindings: Bindings,
}

impl NamedStatement {
    fn new(name: String, sql: String) -> Self {
        NamedStatement {
            name,
            sql,
            bindings: Bindings::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SQL text the statement was compiled from
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Kind of the leading verb; decides whether `exec` returns rows
    pub fn kind(&self) -> Option<QueryKind> {
        QueryKind::classify(&self.sql)
    }

    /// Whether `exec` reads rows back for this statement
    pub fn is_select(&self) -> bool {
        self.kind() == Some(QueryKind::Select)
    }

    pub(crate) fn bind(&mut self, placeholder: &str, value: BoundValue) {
        self.bindings.set(normalize_placeholder(placeholder), value);
    }
}

/// Rejects names that cannot be registered.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SqlGateError::Configuration(
            "statement name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Named statements owned by one facade.
///
/// Registering a name twice replaces the earlier statement and its bindings.
/// Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct StatementRegistry {
    statements: HashMap<String, NamedStatement>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `sql` under `name`, replacing any earlier registration.
    ///
    /// The SQL must already have been compiled by the backend.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::Configuration` if `name` is empty.
    pub fn register(&mut self, name: &str, sql: &str) -> Result<&NamedStatement> {
        check_name(name)?;
        let statement = NamedStatement::new(name.to_string(), sql.to_string());
        self.statements.insert(name.to_string(), statement);
        self.get(name)
    }

    /// Looks up the statement registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::NotFound` if `name` is empty or was never registered.
    pub fn get(&self, name: &str) -> Result<&NamedStatement> {
        self.statements
            .get(name)
            .ok_or_else(|| SqlGateError::NotFound(name.to_string()))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut NamedStatement> {
        self.statements
            .get_mut(name)
            .ok_or_else(|| SqlGateError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.statements.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
