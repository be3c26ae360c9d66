//! Error types for city-directory
//!
//! This module provides the error taxonomy for the generation pipeline:
//! - Storage errors, with "not found" as a first-class variant rather than a message match
//! - Fetch errors mapped from the provider's transport and status codes
//! - Transformation errors raised while structuring raw text
//! - Run-level errors (invalid range, empty entity list) that abort a run before it starts
//!
//! Per-entity errors never escape a run; the orchestrator folds them into
//! [`Outcome::Failed`](crate::types::Outcome) using [`Error::error_code`] and the
//! display string.

use thiserror::Error;

/// Result type alias for city-directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for city-directory
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "provider.api_url")
        key: Option<String>,
    },

    /// Content store operation failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Provider call failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Raw text could not be turned into a structured record
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Requested subrange starts past the end of the entity list
    #[error("invalid range: start index {start} is out of bounds for {total} entities")]
    InvalidRange {
        /// Requested start index
        start: usize,
        /// Number of entities in the list
        total: usize,
    },

    /// The entity list (or requested batch) contains no entities
    #[error("entity list is empty")]
    EmptyEntityList,

    /// I/O error outside of a content store operation (e.g. loading a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Content store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob exists at the path
    #[error("blob not found: {path}")]
    NotFound {
        /// The path that was looked up
        path: String,
    },

    /// Writing a blob failed; nothing is visible at `path` from this write
    #[error("failed to write blob {path}: {source}")]
    Write {
        /// The path that was being written
        path: String,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A blob exists but could not be read or parsed
    #[error("failed to read blob {path}: {reason}")]
    Read {
        /// The path that was being read
        path: String,
        /// Why the read failed (I/O error or unparseable envelope)
        reason: String,
    },

    /// The path is not a valid blob key
    #[error("invalid blob path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Listing a prefix failed for a reason other than the prefix being absent
    #[error("failed to list prefix {prefix}: {reason}")]
    List {
        /// The prefix being listed
        prefix: String,
        /// The underlying failure
        reason: String,
    },
}

impl StorageError {
    /// Build a [`StorageError::Read`] for a blob on disk
    pub(crate) fn read(path: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::Read {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is the expected "nothing stored here" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Provider fetch errors
///
/// The client never retries; callers decide whether a failure is recorded or retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The provider rejected the credential (HTTP 401)
    #[error("invalid provider API key")]
    Unauthorized,

    /// The provider is throttling requests (HTTP 429)
    #[error("rate limit exceeded for provider API")]
    RateLimited,

    /// Any other provider-reported failure, carrying the provider's message
    #[error("provider API error: {0}")]
    Provider(String),

    /// Network failure or timeout before a provider response was received
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered but the answer had no content
    #[error("provider returned no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Provider(format!("malformed response: {e}"))
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Raw text could not be structured
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    /// Create a transform error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error means "nothing stored at the path"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_not_found())
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Storage(e) => match e {
                StorageError::NotFound { .. } => "not_found",
                StorageError::Write { .. } => "storage_write_error",
                StorageError::Read { .. } => "storage_read_error",
                StorageError::InvalidPath { .. } => "invalid_path",
                StorageError::List { .. } => "storage_list_error",
            },
            Error::Fetch(e) => match e {
                FetchError::Unauthorized => "unauthorized",
                FetchError::RateLimited => "rate_limited",
                FetchError::Provider(_) => "provider_error",
                FetchError::Transport(_) => "transport_error",
                FetchError::EmptyResponse => "empty_response",
            },
            Error::Transform(_) => "transform_error",
            Error::InvalidRange { .. } => "invalid_range",
            Error::EmptyEntityList => "empty_entity_list",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Attach the file path to an I/O error raised while loading an input file
pub(crate) fn file_context(path: &std::path::Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("{}: {}", path.display(), e),
    ))
}
