//! Error types for calidad.

use std::path::PathBuf;

/// Result type alias for calidad operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in calidad operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error during data processing.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error during file operations.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Dataset, variant, version or file could not be resolved.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Required column absent from the table or of an unusable type.
    #[error("Column '{column}' not found in dataset '{dataset}'")]
    ColumnNotFound {
        /// The dataset the column was looked up in.
        dataset: String,
        /// The name of the missing column.
        column: String,
    },

    /// Unsupported analysis or plot request.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the unsupported request.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a column-not-found error naming the dataset it was missing from.
    pub fn column_not_found(dataset: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            dataset: dataset.into(),
            column: column.into(),
        }
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/path/to/file");
        assert!(err.to_string().contains("/path/to/file"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_not_found() {
        let err = Error::not_found("dataset 'wiki' has no variant 'clean'");
        assert!(err.to_string().contains("wiki"));
        assert!(err.to_string().contains("clean"));
    }

    #[test]
    fn test_column_not_found_names_dataset_and_column() {
        let err = Error::column_not_found("webcrawl", "token_count");
        let msg = err.to_string();
        assert!(msg.contains("webcrawl"));
        assert!(msg.contains("token_count"));
    }

    #[test]
    fn test_invalid_operation() {
        let err = Error::invalid_operation("boxplot requires a numeric column");
        assert!(err.to_string().contains("boxplot requires a numeric column"));
    }

    #[test]
    fn test_invalid_config() {
        let err = Error::invalid_config("workers must be positive");
        assert!(err.to_string().contains("workers must be positive"));
    }
}
