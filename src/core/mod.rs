/// Core Module for sqlgate
///
/// This module contains the building blocks the `Database` facade is composed
/// of: the backend seam, connection setup, statement registry, parameter
/// binding, query classification and the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SqlGateError};
