use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Revision conflict for {uid}: expected {expected}, found {found}")]
    Conflict { uid: String, expected: u64, found: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RankError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            RankError::NotFound(_) => true, // lazy init
            RankError::Storage(_) => true,
            RankError::Conflict { .. } => true, // reload and retry
            RankError::Io(_) => true,
            RankError::Validation(_) => false,
            RankError::Configuration(_) => false,
            RankError::InvariantViolation(_) => false,
            _ => false,
        }
    }

    /// Stable code used by the JSON API envelope
    pub fn code(&self) -> &'static str {
        match self {
            RankError::Configuration(_) => "CONFIG_ERROR",
            RankError::NotFound(_) => "NOT_FOUND",
            RankError::Validation(_) => "VALIDATION_ERROR",
            RankError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            RankError::Storage(_) => "STORAGE_ERROR",
            RankError::Conflict { .. } => "CONFLICT",
            RankError::Serialization(_) | RankError::Yaml(_) => "SERIALIZATION_ERROR",
            RankError::Io(_) => "IO_ERROR",
        }
    }
}

pub type RankResult<T> = std::result::Result<T, RankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(RankError::NotFound("p1".into()).is_recoverable());
        assert!(RankError::Conflict { uid: "p1".into(), expected: 1, found: 2 }.is_recoverable());
        assert!(!RankError::Validation("empty".into()).is_recoverable());
        assert!(!RankError::Configuration("bad table".into()).is_recoverable());
    }

    #[test]
    fn test_codes_and_messages() {
        let err = RankError::Validation("ai_count must be >= 0".into());
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.to_string(), "Validation error: ai_count must be >= 0");

        let conflict = RankError::Conflict { uid: "u".into(), expected: 3, found: 4 };
        assert!(conflict.to_string().contains("expected 3, found 4"));
    }

    #[test]
    fn test_from_json_error() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: RankError = parse.unwrap_err().into();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
    }
}
