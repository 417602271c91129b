//! Error types for reconciliation operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;
use crate::convert::ConversionError;
use crate::mrn::IdentifierError;
use crate::validation::Violation;

/// Errors returned by the reconciliation controllers.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid configuration: {}", join_violations(.0))]
    Configuration(Vec<Violation>),

    #[error("Remote {operation} failed: {source}")]
    Client {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Invalid identifier: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

impl ReconcileError {
    pub(crate) fn client(operation: &'static str, source: ClientError) -> Self {
        ReconcileError::Client { operation, source }
    }

    /// Violations, if this is a configuration error.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ReconcileError::Configuration(violations) => violations,
            _ => &[],
        }
    }

    /// The remote error, if a remote call failed.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            ReconcileError::Client { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors while loading framework content from a data URL.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse framework content: {0}")]
    Parse(String),

    #[error("Framework content declares no frameworks")]
    NoFramework,

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
