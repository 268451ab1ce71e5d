use crate::blob::{BlobError, BlobStore, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-process blob store for tests, with optional write failure injection
#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.buckets
            .get_mut()
            .entry(bucket.to_string())
            .or_default();
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|b| b.get(object)).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn read_object(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| BlobError::BucketNotFound(bucket.to_string()))?;
        objects
            .get(object)
            .cloned()
            .ok_or_else(|| BlobError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })
    }

    async fn write_object(&self, bucket: &str, object: &str, data: Vec<u8>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Unexpected {
                status: 503,
                body: "injected write failure".to_string(),
            });
        }

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| BlobError::BucketNotFound(bucket.to_string()))?;
        objects.insert(object.to_string(), data);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
