use thiserror::Error;

/// Top-level error type for the widget core.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// ReservaError` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReservaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Booking error: {0}")]
    Booking(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ReservaError {
    fn from(err: toml::de::Error) -> Self {
        ReservaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ReservaError {
    fn from(err: toml::ser::Error) -> Self {
        ReservaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReservaError {
    fn from(err: serde_json::Error) -> Self {
        ReservaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for widget-core operations.
pub type Result<T> = std::result::Result<T, ReservaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReservaError::Config("missing tenant id".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing tenant id");

        let err = ReservaError::Session("store poisoned".to_string());
        assert_eq!(err.to_string(), "Session error: store poisoned");

        let err = ReservaError::Booking("slot taken".to_string());
        assert_eq!(err.to_string(), "Booking error: slot taken");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReservaError = io_err.into();
        assert!(matches!(err, ReservaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: ReservaError = parsed.unwrap_err().into();
        assert!(matches!(err, ReservaError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parsed: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ invalid }");
        let err: ReservaError = parsed.unwrap_err().into();
        assert!(matches!(err, ReservaError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(7);
            let _value = io_result?;
            Ok("ok".to_string())
        }
        assert_eq!(inner().unwrap(), "ok");
    }
}
