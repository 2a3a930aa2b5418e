//! Error types for garden operations.
//!
//! This module provides the error hierarchy shared by every engine, with
//! structured error codes and suggestions for resolution.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for garden operations.
pub type GardenResult<T> = Result<T, GardenError>;

/// Main error type for all garden operations.
#[derive(Error, Debug)]
pub enum GardenError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Idea missing or owned by another user.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        idea_id: Option<String>,
    },

    /// Operation not allowed in the idea's current lifecycle state.
    #[error("Invalid state: {message}")]
    InvalidState { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Stored value could not be mapped back into a domain type.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Ideas (IDEA_xxx)
    IdeaNotFound,
    IdeaNotActive,
    IdeaImmature,
    IdeaConflict,
    IdeaMergeParticipants,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidValue,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::IdeaNotFound => "IDEA_001",
            ErrorCode::IdeaNotActive => "IDEA_002",
            ErrorCode::IdeaImmature => "IDEA_003",
            ErrorCode::IdeaConflict => "IDEA_004",
            ErrorCode::IdeaMergeParticipants => "IDEA_005",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidValue => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GardenError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a validation error for a required field that is empty.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            message: format!("{} is required and must not be empty", field),
            code: ErrorCode::ValMissingField,
            details: HashMap::from([("field".to_string(), field.to_string())]),
            suggestion: None,
        }
    }

    /// Create a not found error.
    pub fn not_found(idea_id: impl Into<String>) -> Self {
        let id = idea_id.into();
        Self::NotFound {
            message: format!("Idea with id '{}' not found", id),
            code: ErrorCode::IdeaNotFound,
            idea_id: Some(id),
        }
    }

    /// Create an invalid state error for an idea that is no longer active.
    pub fn not_active(idea_id: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            message: format!("Idea '{}' is already finalized or discarded", idea_id),
            code: ErrorCode::IdeaNotActive,
        }
    }

    /// Create an invalid state error for an idea below the maturity threshold.
    pub fn immature(idea_id: impl std::fmt::Display, refinements: u32, threshold: u32) -> Self {
        Self::InvalidState {
            message: format!(
                "Idea '{}' is not mature enough to finalize: {} of {} refinements",
                idea_id, refinements, threshold
            ),
            code: ErrorCode::IdeaImmature,
        }
    }

    /// Create an invalid state error for a write that lost a revision check.
    pub fn conflict(idea_id: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            message: format!("Idea '{}' was modified concurrently", idea_id),
            code: ErrorCode::IdeaConflict,
        }
    }

    /// Create an invalid state error for a merge with a missing or inactive participant.
    pub fn merge_participants() -> Self {
        Self::InvalidState {
            message: "One or more ideas not found or not active".to_string(),
            code: ErrorCode::IdeaMergeParticipants,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidValue,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::InvalidState { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { .. } => Some("Please check the idea ID and ensure it belongs to you"),
            Self::InvalidState { code, .. } => match code {
                ErrorCode::IdeaImmature => Some("Keep refining the idea before finalizing it"),
                ErrorCode::IdeaConflict => Some("Reload the idea and try again"),
                _ => None,
            },
            Self::Database { .. } => Some("Please check the garden database path and permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GardenError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
