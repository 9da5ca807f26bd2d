//! Reconciler error types

use crate::action::Operation;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a remote client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// 404-class response
    #[error("not found: {0}")]
    NotFound(String),

    /// 409-class response, the remote object is busy
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unexpected response{}: {message}", status_suffix(.status))]
    Unexpected {
        status: Option<u16>,
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl TransportError {
    /// Classify an HTTP status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => TransportError::NotFound(message),
            409 => TransportError::Conflict(message),
            _ => TransportError::Unexpected {
                status: Some(status),
                message,
            },
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        TransportError::Unexpected {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TransportError::Conflict(_))
    }
}

/// A configuration value rejected by an attribute validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for \"{attribute}\": {reason}")]
pub struct ValidationError {
    pub attribute: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the reconciler core
#[derive(Error, Debug)]
pub enum CloudError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot encode \"{attribute}\": {reason}")]
    Encoding { attribute: String, reason: String },

    #[error("{operation} {resource} {} failed: {source}", display_id(.id))]
    Transport {
        operation: Operation,
        resource: String,
        id: Option<String>,
        #[source]
        source: TransportError,
    },

    #[error("{resource} lookup ({filter}) matched {matches} objects, expected exactly one")]
    AmbiguousResult {
        resource: String,
        filter: String,
        matches: usize,
    },

    #[error("{resource} lookup ({filter}) returned no results")]
    NoResults { resource: String, filter: String },

    #[error(
        "timeout after {timeout:?} waiting for {operation} of {resource} ({id}), last status: {}",
        .last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        operation: Operation,
        resource: String,
        id: String,
        last_status: Option<String>,
        timeout: Duration,
    },

    #[error("{resource}: changing {} requires replacement", .attributes.join(", "))]
    ReplacementRequired {
        resource: String,
        attributes: Vec<String>,
    },

    #[error(
        "{operation} of {resource} ({id}) observed unexpected status {status:?}, expected one of {}",
        .expected.join(", ")
    )]
    UnexpectedState {
        operation: Operation,
        resource: String,
        id: String,
        status: String,
        expected: Vec<String>,
    },

    #[error("{operation} of {resource} requires a tracked id")]
    NotTracked {
        operation: Operation,
        resource: String,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!("({})", id),
        None => "(new)".to_string(),
    }
}

impl CloudError {
    /// Busy remote objects are retried by the poll driver instead of aborting it
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CloudError::Transport { source, .. } if source.is_conflict()
        )
    }

    pub fn transport_source(&self) -> Option<&TransportError> {
        match self {
            CloudError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
