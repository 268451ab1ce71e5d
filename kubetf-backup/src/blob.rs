use async_trait::async_trait;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlobError>;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Object not found: {bucket}/{object}")]
    ObjectNotFound { bucket: String, object: String },

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from storage ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

impl BlobError {
    pub fn is_bucket_not_found(&self) -> bool {
        matches!(self, BlobError::BucketNotFound(_))
    }

    pub fn is_object_not_found(&self) -> bool {
        matches!(self, BlobError::ObjectNotFound { .. })
    }
}

/// Remote blob storage holding state backups
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Read a whole object. A missing object is [`BlobError::ObjectNotFound`].
    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>>;

    /// Create or overwrite an object
    async fn write_object(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()>;
}
