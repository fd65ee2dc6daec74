use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type shared across seedbed crates.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The dependency graph or run configuration is malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A required foreign key has no identifiers to reference.
    #[error("empty reference: {entity}.{column} requires '{target}' but its pool is empty")]
    EmptyReference {
        entity: String,
        column: String,
        target: String,
    },
    /// The database connection is unusable.
    #[error("connection error: {0}")]
    Connection(String),
    /// A single row was rejected by a database constraint or trigger.
    #[error("row rejected for '{entity}': {message}")]
    RowRejected { entity: String, message: String },
    /// The whole batch for an entity was rejected and rolled back.
    #[error("batch rejected for '{entity}': {message}")]
    BatchRejected { entity: String, message: String },
    /// The run was cancelled at an entity boundary.
    #[error("run cancelled before '{0}'")]
    Cancelled(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::EmptyReference { .. } => ErrorKind::EmptyReference,
            Error::Connection(_) => ErrorKind::Connection,
            Error::RowRejected { .. } => ErrorKind::RowRejected,
            Error::BatchRejected { .. } => ErrorKind::BatchRejected,
            Error::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Whether the error stops the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::RowRejected { .. })
    }
}

/// Serializable tag for an [`Error`], used in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    EmptyReference,
    Connection,
    RowRejected,
    BatchRejected,
    Cancelled,
}

/// Convenience alias for results returned by seedbed crates.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_row_rejections_are_contained() {
        let row = Error::RowRejected {
            entity: "profiles".to_string(),
            message: "trigger".to_string(),
        };
        let batch = Error::BatchRejected {
            entity: "profiles".to_string(),
            message: "trigger".to_string(),
        };
        assert!(!row.is_fatal());
        assert!(batch.is_fatal());
        assert!(Error::Connection("reset".to_string()).is_fatal());
        assert_eq!(batch.kind(), ErrorKind::BatchRejected);
    }
}
