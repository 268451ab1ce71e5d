//! Object store seam
//!
//! The operator talks to the cluster only through [`ObjectStore`], a small
//! get/list/create/update interface over JSON documents with optimistic
//! concurrency on `metadata.resourceVersion`. [`Api`] layers typed access on
//! top. Two stores ship with the crate: [`MemoryStore`] for tests and
//! [`FileStore`], which keeps one YAML document per object under a directory.

mod document;
pub mod api;
pub mod error;
pub mod file;
pub mod memory;

pub use api::Api;
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use kubetf_types::ObjectKey;
use serde_json::Value;

/// Which part of an existing object an update may replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Everything except `status`
    Object,
    /// Only `status`
    Status,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<Value>;

    /// List objects of a kind, optionally restricted to one namespace
    async fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<Value>>;

    /// Create an object. Fails if it exists or carries a resource version.
    async fn create(&self, kind: &str, object: Value) -> Result<Value>;

    /// Replace an object. The incoming resource version must match the
    /// stored one.
    async fn update(&self, kind: &str, object: Value, scope: UpdateScope) -> Result<Value>;

    async fn delete(&self, kind: &str, key: &ObjectKey) -> Result<()>;
}
