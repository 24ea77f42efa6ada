//! Remote host access: one short-lived connection per request, no pooling.

pub mod classify;
pub mod error;
#[cfg(feature = "odbc")]
pub mod odbc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogQueryBuilder, SqlStatement};

pub use classify::{ClassifiedError, ErrorCategory, ErrorClassifier};
pub use error::RemoteError;

/// Credentials for the remote host. `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self { host: host.into(), user: user.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// `LIBRARY/FILE` resolution with the job's library list.
    System,
    Sql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDetail {
    Basic,
    Full,
}

/// Connection options every gateway connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionsProfile {
    pub prompt: bool,
    pub naming: Naming,
    pub errors: ErrorDetail,
}

impl Default for OptionsProfile {
    fn default() -> Self {
        Self { prompt: false, naming: Naming::System, errors: ErrorDetail::Full }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub credentials: Credentials,
    pub profile: OptionsProfile,
}

impl ConnectionDescriptor {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, profile: OptionsProfile::default() }
    }

    /// ODBC connection string for the IBM i Access driver. Every value is
    /// brace-quoted so client-supplied text cannot add attributes.
    pub fn to_odbc_string(&self, driver: &str) -> String {
        let naming = match self.profile.naming {
            Naming::Sql => 0,
            Naming::System => 1,
        };
        format!(
            "DRIVER={};SYSTEM={};UID={};PWD={};NAM={};",
            odbc_quote(driver),
            odbc_quote(&self.credentials.host),
            odbc_quote(&self.credentials.user),
            odbc_quote(&self.credentials.password),
            naming
        )
    }
}

fn odbc_quote(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// Redacted form, safe for logs: host and options only.
impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let naming = match self.profile.naming {
            Naming::System => "system",
            Naming::Sql => "sql",
        };
        let errors = match self.profile.errors {
            ErrorDetail::Basic => "basic",
            ErrorDetail::Full => "full",
        };
        write!(
            f,
            "as400://{};prompt={};naming={};errors={}",
            self.credentials.host, self.profile.prompt, naming, errors
        )
    }
}

/// Rows as returned by the remote cursor, columns in cursor order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One JSON object per row, keys in column order.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    /// Values of the first column rendered as text (catalog listings).
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(value_to_text)
            .collect()
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim_end().to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
pub trait RemoteDriver: Send + Sync {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn RemoteConnection>, RemoteError>;
}

#[async_trait]
pub trait RemoteConnection: Send {
    async fn query(&mut self, statement: &SqlStatement) -> Result<RowSet, RemoteError>;

    async fn close(self: Box<Self>) -> Result<(), RemoteError>;

    /// Let go of a connection whose last call was abandoned, without waiting
    /// for the remote side to finish. The default just drops it.
    fn detach(self: Box<Self>) {}
}

/// Opens one connection per call. Nothing is pooled or retried.
#[derive(Clone)]
pub struct RemoteConnector {
    driver: Arc<dyn RemoteDriver>,
    timeout: Option<Duration>,
}

impl RemoteConnector {
    pub fn new(driver: Arc<dyn RemoteDriver>) -> Self {
        Self { driver, timeout: None }
    }

    /// Bound every connect and query by `timeout`. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn open(&self, credentials: &Credentials) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        let descriptor = ConnectionDescriptor::new(credentials.clone());
        tracing::debug!("Opening remote connection: {}", descriptor);
        self.bounded(self.driver.connect(&descriptor)).await
    }

    /// Open, run one statement, and close. The connection is released on
    /// every path, including when the statement fails. A statement that runs
    /// past the timeout has its connection detached rather than closed.
    pub async fn run(&self, credentials: &Credentials, statement: &SqlStatement) -> Result<RowSet, RemoteError> {
        let mut connection = self.open(credentials).await?;
        let result = self.bounded(connection.query(statement)).await;

        if let Err(RemoteError::Timeout(limit)) = &result {
            // The abandoned call may still be running remotely
            tracing::warn!("Detaching remote connection to {} after {:?}", credentials.host, limit);
            connection.detach();
        } else if let Err(e) = connection.close().await {
            tracing::warn!("Failed to close remote connection to {}: {}", credentials.host, e);
        }

        match &result {
            Ok(rows) => tracing::debug!("Remote query returned {} rows", rows.len()),
            Err(e) => tracing::warn!("Remote query failed on {}: {}", credentials.host, e),
        }
        result
    }

    /// Trivial round trip proving the credentials work.
    pub async fn probe(&self, credentials: &Credentials) -> Result<(), RemoteError> {
        self.run(credentials, &CatalogQueryBuilder::probe()).await.map(|_| ())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or(Err(RemoteError::Timeout(limit))),
            None => fut.await,
        }
    }
}
