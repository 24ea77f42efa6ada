use std::time::Duration;
use thiserror::Error;

use super::classify::{ClassifiedError, ErrorClassifier};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("I/O error: remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("driver task failed: {0}")]
    Driver(String),
}

impl RemoteError {
    /// Raw driver text, as reported by the remote side.
    pub fn raw(&self) -> String {
        match self {
            RemoteError::Connect(msg) | RemoteError::Query(msg) | RemoteError::Driver(msg) => msg.clone(),
            RemoteError::Timeout(_) => self.to_string(),
        }
    }

    pub fn classify(&self) -> ClassifiedError {
        ErrorClassifier::classify(&self.raw())
    }
}
