/// Database Module
///
/// This module provides the pieces the facade orchestrates, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Backend** (`backend.rs`): the trait every driver implements, plus its error and diagnostics types
/// - **SQLite** (`sqlite.rs`): the rusqlite-backed implementation of `Backend`
/// - **Connection** (`connection.rs`): connection configuration and DSN construction
/// - **Parameters** (`params.rs`): typed parameter values and ordered bindings
/// - **Statements** (`statement.rs`): the named prepared statement registry
/// - **Queries** (`query.rs`): SQL verb classification and result rows
///
/// ## Error Handling
///
/// Backend calls return `BackendError`; the facade logs it and surfaces the
/// generic `SqlGateError::Connection` instead.
pub mod backend;
pub mod connection;
pub mod params;
pub mod query;
pub mod sqlite;
pub mod statement;

pub use backend::*;
pub use connection::*;
pub use params::*;
pub use query::*;
pub use sqlite::SqliteBackend;
pub use statement::*;
