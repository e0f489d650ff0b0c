/// Query Classification Module
///
/// This module provides the SQL verb guard used before ad-hoc queries are
/// dispatched, and the row types returned by every read.

use crate::core::{Result, SqlGateError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// The four statement kinds the facade knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// SELECT statement
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
}

impl QueryKind {
    pub const ALL: [QueryKind; 4] = [
        QueryKind::Select,
        QueryKind::Insert,
        QueryKind::Update,
        QueryKind::Delete,
    ];

    /// The SQL verb for this kind, in lowercase
    pub fn verb(self) -> &'static str {
        match self {
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
        }
    }

    /// Determines the statement kind from the leading verb of a SQL string
    ///
    /// # Returns
    ///
    /// `None` when the leading token is not one of the four known verbs.
    pub fn classify(sql: &str) -> Option<Self> {
        let token = leading_token(sql);
        QueryKind::ALL
            .into_iter()
            .find(|kind| token.eq_ignore_ascii_case(kind.verb()))
    }

    /// Parses a kind name such as `"select"` (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        QueryKind::ALL
            .into_iter()
            .find(|kind| name.eq_ignore_ascii_case(kind.verb()))
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Returns the first run of ASCII letters after any leading whitespace.
fn leading_token(sql: &str) -> &str {
    let trimmed = sql.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Checks that `query` starts with the verb of `kind`.
///
/// This is a guard, not a parser: nothing past the leading verb is inspected.
///
/// # Errors
///
/// Returns `SqlGateError::InvalidQuery` carrying `kind` when the leading verb
/// does not match.
pub fn validate(query: &str, kind: QueryKind) -> Result<()> {
    if QueryKind::classify(query) == Some(kind) {
        Ok(())
    } else {
        Err(SqlGateError::InvalidQuery { expected: kind })
    }
}

/// A single scalar value read back from the database
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(t) => f.write_str(t),
            SqlValue::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

/// One result row: column names paired with their values, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row from parallel column and value vectors.
    ///
    /// Columns without a value, and values without a column, are never
    /// returned by lookups.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Row { columns, values }
    }

    /// Looks a value up by column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
