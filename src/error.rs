//! Error types for issueplanner
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, malformed tracker spec)
//! - 3: Document integrity violation (duplicate sibling names, nothing scheduled)
//! - 4: Operation failed (IO, XML, tracker fetch)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the ip CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const INTEGRITY_VIOLATION: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for issueplanner operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tracker not found: {0}")]
    TrackerNotFound(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Integrity violations (exit code 3)
    #[error("Duplicate task name '{name}' under '{parent}'")]
    DuplicateTaskName { parent: String, name: String },

    #[error("No scheduled tasks: every task start is empty")]
    NoScheduledTasks,

    #[error("Not a planner document: missing {0} element")]
    MalformedDocument(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Failed to fetch issues for {owner}/{slug}: {reason}")]
    TrackerFetch {
        owner: String,
        slug: String,
        reason: String,
    },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::DocumentNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TrackerNotFound(_)
            | Error::InvalidTimestamp(_) => exit_codes::USER_ERROR,

            // Integrity violations
            Error::DuplicateTaskName { .. }
            | Error::NoScheduledTasks
            | Error::MalformedDocument(_) => exit_codes::INTEGRITY_VIOLATION,

            // Operation failures
            Error::Io(_)
            | Error::Xml(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::TrackerFetch { .. }
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::DuplicateTaskName { parent, name } => Some(serde_json::json!({
                "parent": parent,
                "name": name,
            })),
            Error::TrackerFetch { owner, slug, .. } => Some(serde_json::json!({
                "owner": owner,
                "slug": slug,
            })),
            _ => None,
        }
    }
}

/// Result type alias for issueplanner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
