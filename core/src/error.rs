//! Error types for featurekit.
//!
//! - [`EngineError`] - Dataset engine failures (missing columns, partitions)
//! - [`FeatureError`] - Feature construction and application errors
//! - [`CsvError`] - CSV loading errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Dataset Engine Errors
// =============================================================================

/// Errors raised by the in-memory dataset engine.
///
/// These propagate unchanged through [`FeatureError::Engine`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A column expression referenced a column the frame does not have.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A partition count of zero was requested.
    #[error("Invalid number of partitions: {0}")]
    InvalidPartitions(usize),

    /// A transformation was applied before being attached to a feature.
    #[error("Transformation '{0}' is not attached to a feature")]
    Detached(String),

    /// Expression evaluation failed.
    #[error("Evaluation failed on column '{column}': {message}")]
    Evaluation { column: String, message: String },
}

// =============================================================================
// Feature Errors
// =============================================================================

/// Errors while building or applying a feature.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    /// Invariant violation detected while building a feature.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An existing column would be overwritten and conflicts are fatal.
    #[error("Column '{column}' already exists and would be overwritten")]
    SchemaConflict { column: String },

    /// Dataset engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl FeatureError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        FeatureError::InvalidConfiguration(message.into())
    }
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while loading CSV input.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV content.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty input.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV loading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Feature error.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Definition (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two features produce the same output column.
    #[error("Output column '{0}' is produced by more than one feature")]
    DuplicateOutput(String),
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        PipelineError::Feature(FeatureError::Engine(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dataset engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for feature operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
