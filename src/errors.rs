/*!
 * Error types for the weblate-trans data layer.
 *
 * Validation failures and lookup misses are domain errors with their own
 * types; database plumbing errors travel as `anyhow::Error`.
 */

use thiserror::Error;

/// A field value was rejected by one of the validators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Human readable message
    pub message: String,
    /// Stable machine readable code
    pub code: &'static str,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Errors raised when fetching a single object
#[derive(Error, Debug)]
pub enum LookupError {
    /// No row matched the lookup
    #[error("{entity} matching query does not exist: {lookup}")]
    DoesNotExist {
        /// Entity name
        entity: &'static str,
        /// Description of the lookup
        lookup: String,
    },

    /// More rows than one matched the lookup
    #[error("get() returned more than one {entity} -- it returned {count}!")]
    MultipleObjectsReturned {
        /// Entity name
        entity: &'static str,
        /// Number of rows matched
        count: usize,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Errors raised while parsing translation files
#[derive(Error, Debug)]
pub enum FormatError {
    /// The file extension and content did not match a known format
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    /// The content could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Description
        message: String,
    },

    /// Invalid JSON document
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the file failed
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type used at the CLI boundary
#[derive(Error, Debug)]
pub enum AppError {
    /// A validator rejected input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Object lookup failed
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// File parsing failed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
