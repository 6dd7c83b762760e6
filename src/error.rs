//! Error types for the churn service

use thiserror::Error;

/// Result type alias for churn service operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the model lifecycle pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Data unavailable: {source_id}: {reason}")]
    DataUnavailable { source_id: String, reason: String },

    #[error("Dataset is empty after dropping incomplete rows: {0}")]
    EmptyDataset(String),

    #[error("Label column not found: {0}")]
    MissingLabelColumn(String),

    #[error("Schema mismatch: model expects {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Column mismatch at position {index}: expected '{expected}', got '{actual}'")]
    ColumnMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Duplicate encoded column: {0}")]
    DuplicateColumn(String),

    #[error("Feature count mismatch: expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Invalid feature value for '{feature}': {reason}")]
    InvalidFeatureValue { feature: String, reason: String },

    #[error("Unseen category '{category}' for feature '{feature}'")]
    UnseenCategory { feature: String, category: String },

    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Invalid hyperparameter: {name} = {value}, {reason}")]
    InvalidHyperparameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Training failed: {0}")]
    TrainingFailure(String),

    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("Model artifact unavailable: {key}: {reason}")]
    ArtifactUnavailable { key: String, reason: String },

    #[error("No model loaded")]
    ModelNotLoaded,

    #[error("A retrain is already in progress")]
    RetrainInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChurnError {
    /// Shorthand for a data source that could not be read
    pub fn data_unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        ChurnError::DataUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the caller supplied bad input, as opposed to a server-side fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChurnError::SchemaMismatch { .. }
                | ChurnError::ColumnMismatch { .. }
                | ChurnError::FeatureCountMismatch { .. }
                | ChurnError::InvalidFeatureValue { .. }
                | ChurnError::UnseenCategory { .. }
                | ChurnError::MissingFeature(_)
                | ChurnError::InvalidHyperparameter { .. }
        )
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::data_unavailable("polars", err)
    }
}

impl From<bincode::Error> for ChurnError {
    fn from(err: bincode::Error) -> Self {
        ChurnError::CorruptArtifact(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::TrainingFailure(format!("invalid matrix shape: {}", err))
    }
}
