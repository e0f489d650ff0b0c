// Core infrastructure modules
pub mod core;

pub mod config;
pub mod database;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{
    validate, BoundValue, ConnectionConfig, Dsn, ErrorInfo, NamedStatement, ParamValue, QueryKind,
    Row, SqlValue, SqliteBackend,
};
pub use crate::core::{Result, SqlGateError};
pub use database::{Database, ExecOutcome, WriteOutcome};
