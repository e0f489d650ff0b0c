/// Connection Configuration Module
///
/// This module holds the connection record a facade is opened from and the
/// DSN built out of it. Opening the connection itself is the backend's job;
/// see `Database::open`.

use crate::core::db::backend::{ConnectOptions, Credentials, ERRMODE_EXCEPTION, ERRMODE_OPTION};
use crate::core::{Result, SqlGateError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Character set every DSN is built with
pub const DSN_CHARSET: &str = "utf8";

/// Everything needed to reach a database.
///
/// `driver`, `db_name` and `host` are required; they are optional here so that
/// a missing field is reported as a configuration error rather than a parse
/// failure.
#[derive(Clone, Default, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    pub driver: Option<String>,
    pub db_name: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Backend-specific options
    #[serde(default)]
    pub option: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("db_name", &self.db_name)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("option", &self.option)
            .finish()
    }
}

impl ConnectionConfig {
    /// Creates a config with the three required fields set
    pub fn new(driver: impl Into<String>, db_name: impl Into<String>, host: impl Into<String>) -> Self {
        ConnectionConfig {
            driver: Some(driver.into()),
            db_name: Some(db_name.into()),
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// A SQLite config for the given database path (`:memory:` for an in-memory database)
    pub fn sqlite(db_name: impl Into<String>) -> Self {
        ConnectionConfig::new("sqlite", db_name, "localhost")
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.option.insert(key.into(), value.into());
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    /// The caller's options with the error mode forced to `exception`
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = self.option.clone();
        options.insert(ERRMODE_OPTION.to_string(), ERRMODE_EXCEPTION.to_string());
        options
    }
}

/// A data source name: `driver:dbname=<name>;host=<host>;charset=utf8`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub driver: String,
    pub db_name: String,
    pub host: String,
}

impl Dsn {
    /// Builds a DSN from the required fields of `config`.
    ///
    /// # Errors
    ///
    /// Returns `SqlGateError::Configuration` if driver, database name or host
    /// is missing or blank.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        Ok(Dsn {
            driver: required(&config.driver, "driver")?,
            db_name: required(&config.db_name, "db_name")?,
            host: required(&config.host, "host")?,
        })
    }
}

fn required(field: &Option<String>, name: &str) -> Result<String> {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(SqlGateError::Configuration(format!(
            "missing required connection field '{}'",
            name
        ))),
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:dbname={};host={};charset={}",
            self.driver, self.db_name, self.host, DSN_CHARSET
        )
    }
}
