use thiserror::Error;

/// Errors surfaced by storage backends.
///
/// Backends must keep these two kinds apart: a rejected statement leaves the
/// connection usable, a connection error does not.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The database refused the statement (constraint, trigger, type mismatch).
    #[error("statement rejected{}: {message}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Rejected {
        code: Option<String>,
        message: String,
    },
    /// The connection is lost, unreachable or otherwise unusable.
    #[error("connection error: {0}")]
    Connection(String),
    /// Connection settings are missing or malformed.
    #[error("invalid connection configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        StoreError::Rejected {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::Rejected { .. })
    }
}

impl From<StoreError> for seedbed_core::Error {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Config(message) => seedbed_core::Error::Configuration(message),
            other => seedbed_core::Error::Connection(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
