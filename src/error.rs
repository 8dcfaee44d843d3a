//! Error types for todocal
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad input, missing record)
//! - 4: Operation failed (storage or network failure)

use thiserror::Error;

use crate::models::TaskId;

/// Exit codes for the todocal CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for todocal operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("A due date is required for repeating tasks")]
    MissingAnchorDate,

    #[error("Invalid time '{0}': use H:MM or HH:MM with hour 0-12 and minute 00-59")]
    InvalidTimeFormat(String),

    #[error("Task text must not be empty")]
    EmptyText,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not signed in: the task service rejected the session")]
    NotAuthenticated,

    // Operation failures (exit code 4)
    #[error("Task service unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Created {created} of {requested} occurrences before failing: {source}")]
    PartialCreation {
        created: usize,
        requested: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingAnchorDate
            | Error::InvalidTimeFormat(_)
            | Error::EmptyText
            | Error::InvalidArgument(_)
            | Error::NotFound(_)
            | Error::DuplicateIdentifier(_)
            | Error::InvalidConfig(_)
            | Error::NotAuthenticated => exit_codes::USER_ERROR,

            Error::CollaboratorUnavailable(_)
            | Error::PartialCreation { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True for errors raised before any persistence call was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingAnchorDate
                | Error::InvalidTimeFormat(_)
                | Error::EmptyText
                | Error::InvalidArgument(_)
        )
    }
}

/// Result type alias for todocal operations
pub type Result<T> = std::result::Result<T, Error>;
