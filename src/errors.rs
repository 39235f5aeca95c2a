//! Errors.
use std::fmt::Display;

/// Error type shared by every fallible operation in this crate.
///
/// The variants mirror the status kinds used by the storage layer:
/// user errors (`InvalidArgument`, `NotFound`, `AlreadyExists`,
/// `FailedPrecondition`), transient races (`Aborted`), and corruption or
/// programming errors (`DataLoss`, `Internal`).
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Malformed input, e.g., a non-positive page size or a page token that
    /// does not match the request options.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The database is in a state the current library cannot work with,
    /// e.g., its schema version is newer than the library version.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A transient conflict such as a deadlock or a concurrent
    /// initialization race. Safe to retry.
    #[error("aborted: {0}")]
    Aborted(String),

    /// The stored data contradicts the schema invariants.
    #[error("data loss: {0}")]
    DataLoss(String),

    /// A query failed or returned something this crate cannot interpret.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    pub(crate) fn invalid_argument(message: impl Display) -> Self {
        Self::InvalidArgument(message.to_string())
    }

    pub(crate) fn not_found(message: impl Display) -> Self {
        Self::NotFound(message.to_string())
    }

    pub(crate) fn already_exists(message: impl Display) -> Self {
        Self::AlreadyExists(message.to_string())
    }

    pub(crate) fn failed_precondition(message: impl Display) -> Self {
        Self::FailedPrecondition(message.to_string())
    }

    pub(crate) fn aborted(message: impl Display) -> Self {
        Self::Aborted(message.to_string())
    }

    pub(crate) fn data_loss(message: impl Display) -> Self {
        Self::DataLoss(message.to_string())
    }

    pub(crate) fn internal(message: impl Display) -> Self {
        Self::Internal(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Whether the error reports a transient conflict that a caller (or the
    /// store façade) may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Whether the underlying engine rejected a statement because of a
    /// primary-key or unique constraint. SQLite reports these as "UNIQUE
    /// constraint failed", MySQL as "Duplicate entry".
    pub(crate) fn is_unique_constraint_violation(&self) -> bool {
        match self {
            Self::Internal(message) => {
                message.contains("UNIQUE") || message.contains("Duplicate")
            }
            Self::AlreadyExists(_) => true,
            _ => false,
        }
    }

    /// Adds a context prefix while keeping the error kind.
    pub(crate) fn with_context(self, context: impl Display) -> Self {
        let attach = |message: String| format!("{}: {}", context, message);
        match self {
            Self::InvalidArgument(m) => Self::InvalidArgument(attach(m)),
            Self::NotFound(m) => Self::NotFound(attach(m)),
            Self::AlreadyExists(m) => Self::AlreadyExists(attach(m)),
            Self::FailedPrecondition(m) => Self::FailedPrecondition(attach(m)),
            Self::Aborted(m) => Self::Aborted(attach(m)),
            Self::DataLoss(m) => Self::DataLoss(attach(m)),
            Self::Internal(m) => Self::Internal(attach(m)),
        }
    }
}

// Phrases the engines use to report lock conflicts and dropped connections.
const TRANSIENT_MARKERS: &[&str] = &[
    "database is locked",
    "database table is locked",
    "Deadlock found",
    "Lock wait timeout",
    "Connection reset",
    "connection was closed",
];

impl From<crate::metadata::ConvertError> for MetadataError {
    fn from(error: crate::metadata::ConvertError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<sqlx::Error> for MetadataError {
    fn from(error: sqlx::Error) -> Self {
        let message = match &error {
            sqlx::Error::Database(db) => db.message().to_owned(),
            other => other.to_string(),
        };
        if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
            Self::Aborted(message)
        } else {
            Self::Internal(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_recognized_for_both_dialects() {
        let sqlite = MetadataError::internal(
            "UNIQUE constraint failed: Artifact.type_id, Artifact.name",
        );
        assert!(sqlite.is_unique_constraint_violation());

        let mysql =
            MetadataError::internal("Duplicate entry 'model-1' for key 'UniqueArtifactTypeName'");
        assert!(mysql.is_unique_constraint_violation());

        assert!(!MetadataError::internal("syntax error").is_unique_constraint_violation());
    }

    #[test]
    fn context_keeps_the_kind() {
        let err = MetadataError::aborted("deadlock").with_context("Upgrade query failed");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "aborted: Upgrade query failed: deadlock");
    }
}
