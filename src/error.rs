//! Error types for the annotator.

/// Top-level error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scoring error: {0}")]
    Score(#[from] ScoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid thresholds: {0}")]
    Thresholds(String),
}

/// Input-contract violations. All of these fail the run — the engine
/// does not impute, clamp, or skip malformed rows.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{0} must be a valid column in the dataset")]
    MissingColumn(String),

    #[error("Row {row}, column {column}: could not parse {value:?}: {reason}")]
    BadField {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Row {row}, column {column}: probability {value} is outside [0, 1]")]
    ProbabilityRange {
        row: usize,
        column: String,
        value: f64,
    },
}

/// Classifier ensemble errors.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("Model {model} failed to score conversation {conversation_id}: {reason}")]
    ModelFailed {
        model: String,
        conversation_id: String,
        reason: String,
    },
}

/// Storage backend errors (flat file or warehouse).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the annotator.
pub type Result<T> = std::result::Result<T, Error>;
