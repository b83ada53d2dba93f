use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for Ana.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for AnaError` (or the reverse) so that `?` works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AnaError {
    fn from(err: toml::de::Error) -> Self {
        AnaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AnaError {
    fn from(err: toml::ser::Error) -> Self {
        AnaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AnaError {
    fn from(err: serde_json::Error) -> Self {
        AnaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Ana operations.
pub type Result<T> = std::result::Result<T, AnaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnaError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let id = Uuid::nil();
        let cases: Vec<(AnaError, String)> = vec![
            (
                AnaError::Config("bad key".to_string()),
                "Configuration error: bad key".to_string(),
            ),
            (
                AnaError::Storage("disk full".to_string()),
                "Storage error: disk full".to_string(),
            ),
            (
                AnaError::SessionNotFound(id),
                format!("Session not found: {}", id),
            ),
            (
                AnaError::Api("bind failed".to_string()),
                "API error: bind failed".to_string(),
            ),
            (
                AnaError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json".to_string(),
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AnaError = io_err.into();
        assert!(matches!(err, AnaError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let ana_err: AnaError = err.unwrap_err().into();
        assert!(matches!(ana_err, AnaError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let ana_err: AnaError = err.unwrap_err().into();
        assert!(matches!(ana_err, AnaError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
