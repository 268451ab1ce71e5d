use crate::outcome::Outcome;
use kubetf_backup::{BlobError, StateError};
use kubetf_store::StoreError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Backup storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml_ng::Error),

    #[error("No backup store configured for bucket {0}")]
    BackupStoreUnavailable(String),
}

impl ReconcileError {
    /// Classify the error for the caller's retry policy
    pub fn outcome(&self, retry_delay: Duration) -> Outcome {
        match self {
            ReconcileError::Store(e) if e.is_conflict() => Outcome::RetryNow,
            ReconcileError::Store(StoreError::Invalid { .. }) => Outcome::Fatal(self.to_string()),
            ReconcileError::Blob(BlobError::BucketNotFound(_))
            | ReconcileError::Blob(BlobError::InvalidName(_)) => Outcome::Fatal(self.to_string()),
            ReconcileError::State(_)
            | ReconcileError::Serialization(_)
            | ReconcileError::BackupStoreUnavailable(_) => Outcome::Fatal(self.to_string()),
            _ => Outcome::RetryAfter(retry_delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubetf_types::ObjectKey;

    const DELAY: Duration = Duration::from_secs(5);

    #[test]
    fn test_conflicts_retry_immediately() {
        let err = ReconcileError::from(StoreError::Conflict {
            kind: "Workspace".to_string(),
            key: ObjectKey::new("dev", "network"),
        });
        assert_eq!(err.outcome(DELAY), Outcome::RetryNow);
    }

    #[test]
    fn test_transient_errors_retry_after_delay() {
        let err = ReconcileError::from(BlobError::Unexpected {
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.outcome(DELAY), Outcome::RetryAfter(DELAY));

        let err = ReconcileError::from(StoreError::Io(std::io::Error::other("disk")));
        assert_eq!(err.outcome(DELAY), Outcome::RetryAfter(DELAY));
    }

    #[test]
    fn test_misconfiguration_is_fatal() {
        let err = ReconcileError::from(StateError::MissingKey("tfstate".to_string()));
        assert!(matches!(err.outcome(DELAY), Outcome::Fatal(_)));

        let err = ReconcileError::from(BlobError::BucketNotFound("backups".to_string()));
        assert!(matches!(err.outcome(DELAY), Outcome::Fatal(msg) if msg.contains("backups")));
    }
}
