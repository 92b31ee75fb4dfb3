//! Error types for vault-mfa

use thiserror::Error;

/// Result type alias for vault-mfa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vault-mfa
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem failure reading or writing the keystore or master-key file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// AEAD tag mismatch on unwrap, corrupt keystore JSON, or a keystore
    /// invariant violated on load
    #[error("integrity error: {0}")]
    Integrity(String),

    /// A requested key id is not present in the keystore
    #[error("key not found: {0}")]
    NotFound(String),

    /// A keystore invariant was violated outside the delete-active-key path
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A value failed validation independent of any verification path
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A declared configuration is self-contradictory (e.g. a COMBINED
    /// rotation policy missing one of its thresholds)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = Error::NotFound("abc-123".to_string());
        assert_eq!(err.to_string(), "key not found: abc-123");
    }
}
