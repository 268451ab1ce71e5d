use kubetf_types::ObjectKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: String, key: ObjectKey },

    #[error("Conflict updating {kind} {key}: the object has been modified")]
    Conflict { kind: String, key: ObjectKey },

    #[error("Invalid {kind}: {message}")]
    Invalid { kind: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(kind: &str, key: &ObjectKey) -> Self {
        StoreError::NotFound {
            kind: kind.to_string(),
            key: key.clone(),
        }
    }

    pub fn invalid(kind: &str, message: impl Into<String>) -> Self {
        StoreError::Invalid {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
