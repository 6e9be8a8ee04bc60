//! Error types for crimemap.
//!
//! Every fallible operation in the crate returns [`Error`]. Row-level problems
//! in the source data are never errors; they are dropped during cleaning.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for crimemap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Acquisition Errors ===
    /// The HTTP request could not be completed.
    #[error("request to {url} failed: {source}")]
    Http {
        /// The requested URL.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The downloaded archive could not be read or extracted.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // === Source Data Errors ===
    /// The incident CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the incident CSV header.
    #[error("incident data has no '{column}' column")]
    MissingColumn {
        /// Name of the expected column.
        column: String,
    },

    /// The boundary shapefile could not be read.
    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// The expected shapefile is not in the cache directory.
    #[error("shapefile not found at {path}")]
    ShapefileMissing {
        /// Expected location of the `.shp` file.
        path: PathBuf,
    },

    /// No incidents survived cleaning, so no selections can be offered.
    #[error("no incidents remain after cleaning")]
    EmptyDataset,

    /// A month-year value did not match `YYYY-MM`.
    #[error("invalid month-year '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for crimemap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a missing column error.
    #[must_use]
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Check if this error is caused by a bad request parameter rather than
    /// a server-side fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidMonth(_))
    }
}
