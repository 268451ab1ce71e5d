use crate::blob::{BlobError, BlobStore, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Buckets are directories under `root`; objects are files inside them
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        check_relative(bucket)?;
        if bucket.contains('/') {
            return Err(BlobError::InvalidName(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, object: &str) -> Result<PathBuf> {
        check_relative(object)?;
        Ok(self.bucket_dir(bucket)?.join(object))
    }
}

// Names must stay inside the root
fn check_relative(name: &str) -> Result<()> {
    let path = Path::new(name);
    let valid = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidName(name.to_string()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match fs::metadata(self.bucket_dir(bucket)?).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        if !self.bucket_exists(bucket).await? {
            return Err(BlobError::BucketNotFound(bucket.to_string()));
        }

        match fs::read(self.object_path(bucket, object)?).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_object(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(BlobError::BucketNotFound(bucket.to_string()));
        }

        let path = self.object_path(bucket, object)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("partial");
        fs::write(&tmp, &data).await?;
        fs::rename(&tmp, &path).await?;

        debug!(bucket, object, bytes = data.len(), "Wrote backup object");
        Ok(())
    }
}
