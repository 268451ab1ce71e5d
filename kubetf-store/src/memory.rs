use crate::document::{key_of, prepare_create, prepare_update};
use crate::error::{Result, StoreError};
use crate::{Api, ObjectStore, UpdateScope};
use async_trait::async_trait;
use indexmap::IndexMap;
use kubetf_types::{ObjectKey, Resource};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process store keeping objects in insertion order
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    objects: IndexMap<(String, ObjectKey), Value>,
    revision: u64,
}

impl Inner {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create a typed object, dropping any resource version it carries
    pub async fn seed<T: Resource>(self: &Arc<Self>, mut object: T) -> Result<T> {
        object.meta_mut().resource_version = None;
        Api::<T>::new(self.clone()).create(&object).await
    }

    /// Number of stored objects of a kind
    pub async fn count(&self, kind: &str) -> usize {
        let inner = self.inner.read().await;
        inner.objects.keys().filter(|(k, _)| k == kind).count()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<Value> {
        let inner = self.inner.read().await;
        inner
            .objects
            .get(&(kind.to_string(), key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, key))
    }

    async fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<Value>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .iter()
            .filter(|((k, key), _)| k == kind && namespace.map_or(true, |ns| key.namespace == ns))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn create(&self, kind: &str, object: Value) -> Result<Value> {
        let key = key_of(kind, &object)?;
        let mut inner = self.inner.write().await;

        let slot = (kind.to_string(), key.clone());
        if inner.objects.contains_key(&slot) {
            return Err(StoreError::AlreadyExists {
                kind: kind.to_string(),
                key,
            });
        }

        let revision = inner.next_revision();
        let created = prepare_create(kind, object, revision)?;
        inner.objects.insert(slot, created.clone());
        Ok(created)
    }

    async fn update(&self, kind: &str, object: Value, scope: UpdateScope) -> Result<Value> {
        let key = key_of(kind, &object)?;
        let mut inner = self.inner.write().await;

        let slot = (kind.to_string(), key.clone());
        let current = inner
            .objects
            .get(&slot)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, &key))?;

        let revision = inner.next_revision();
        let updated = prepare_update(kind, &current, object, scope, revision)?;
        inner.objects.insert(slot, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, kind: &str, key: &ObjectKey) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .objects
            .shift_remove(&(kind.to_string(), key.clone()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind, key))
    }
}
