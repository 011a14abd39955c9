use thiserror::Error;

/// Main error type for ragindex
#[derive(Error, Debug)]
pub enum RagindexError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State file, journal or document store (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding service errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// A source file could not be converted into a structured document
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// A structured document could not be chunked
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Vector index errors: dimension mismatch, corrupt or incomplete artifacts
    #[error("Index error: {0}")]
    Index(String),

    /// Another ingestion run holds the state directory
    #[error("Ingestion already running (lock file {0} exists; remove it if no run is active)")]
    Locked(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using RagindexError
pub type Result<T> = std::result::Result<T, RagindexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagindexError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagindexError = io_err.into();
        assert!(matches!(err, RagindexError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: RagindexError = json_err.into();
        assert!(matches!(err, RagindexError::Json(_)));
    }

    #[test]
    fn test_locked_mentions_path() {
        let err = RagindexError::Locked("/tmp/db/.ingest.lock".to_string());
        assert!(err.to_string().contains("/tmp/db/.ingest.lock"));
    }
}
