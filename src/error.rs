//! Error types for fileshare.

use thiserror::Error;

/// Common error type for fileshare.
#[derive(Error, Debug)]
pub enum FileShareError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Object storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport error talking to a remote backend.
    #[error("http error: {0}")]
    Http(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FileShareError {
    /// Whether this error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileShareError::NotFound(_))
    }

    /// Message suitable for showing to the user.
    ///
    /// Provider-facing variants return their text without the category
    /// prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            FileShareError::Auth(msg)
            | FileShareError::Permission(msg)
            | FileShareError::Validation(msg)
            | FileShareError::Storage(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for FileShareError {
    fn from(e: sqlx::Error) -> Self {
        FileShareError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for FileShareError {
    fn from(e: reqwest::Error) -> Self {
        FileShareError::Http(e.to_string())
    }
}

/// Result type alias for fileshare operations.
pub type Result<T> = std::result::Result<T, FileShareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = FileShareError::Auth("Invalid login credentials".to_string());
        assert_eq!(
            err.to_string(),
            "authentication error: Invalid login credentials"
        );
    }

    #[test]
    fn test_permission_error_display() {
        let err = FileShareError::Permission("not the owner".to_string());
        assert_eq!(err.to_string(), "permission denied: not the owner");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FileShareError::NotFound("Object".to_string());
        assert_eq!(err.to_string(), "Object not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_storage_error_is_not_not_found() {
        let err = FileShareError::Storage("disk full".to_string());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn test_message_strips_category() {
        let err = FileShareError::Auth("Invalid login credentials".to_string());
        assert_eq!(err.message(), "Invalid login credentials");
        let err = FileShareError::NotFound("Bucket".to_string());
        assert_eq!(err.message(), "Bucket not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FileShareError = io_err.into();
        assert!(matches!(err, FileShareError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FileShareError::Validation("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
