//! Error types for the ETL pipeline

use thiserror::Error;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors raised while shaping, staging or loading batches
#[derive(Error, Debug)]
pub enum EtlError {
    /// A batch is missing a column an operation needs, or does not fit a
    /// table's schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A row was rejected while building a batch
    #[error("Invalid row {row}, column '{column}': {reason}")]
    InvalidRow {
        row: usize,
        column: String,
        reason: String,
    },

    /// The bulk copy into a table was rejected
    #[error("Load into '{table}' failed: {message}")]
    LoadFailure { table: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] sparkify_common::CommonError),
}

impl EtlError {
    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    /// Create a load failure for `table`
    pub fn load_failure(table: &str, message: impl ToString) -> Self {
        Self::LoadFailure {
            table: table.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
