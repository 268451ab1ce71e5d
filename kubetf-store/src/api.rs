use crate::error::{Result, StoreError};
use crate::{ObjectStore, UpdateScope};
use kubetf_types::{ObjectKey, Resource};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed view of one kind in an [`ObjectStore`]
pub struct Api<T> {
    store: Arc<dyn ObjectStore>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Api<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: Resource> Api<T> {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    pub async fn get(&self, key: &ObjectKey) -> Result<T> {
        decode(self.store.get(T::KIND, key).await?)
    }

    /// Like [`Api::get`], mapping not-found to `None`
    pub async fn get_opt(&self, key: &ObjectKey) -> Result<Option<T>> {
        match self.get(key).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list(&self, namespace: &str) -> Result<Vec<T>> {
        self.store
            .list(T::KIND, Some(namespace))
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn list_all(&self) -> Result<Vec<T>> {
        self.store
            .list(T::KIND, None)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn create(&self, object: &T) -> Result<T> {
        decode(self.store.create(T::KIND, encode(object)?).await?)
    }

    pub async fn update(&self, object: &T) -> Result<T> {
        decode(
            self.store
                .update(T::KIND, encode(object)?, UpdateScope::Object)
                .await?,
        )
    }

    pub async fn update_status(&self, object: &T) -> Result<T> {
        decode(
            self.store
                .update(T::KIND, encode(object)?, UpdateScope::Status)
                .await?,
        )
    }

    pub async fn delete(&self, key: &ObjectKey) -> Result<()> {
        self.store.delete(T::KIND, key).await
    }
}

fn encode<T: Resource>(object: &T) -> Result<Value> {
    serde_json::to_value(object).map_err(StoreError::from)
}

fn decode<T: Resource>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(StoreError::from)
}
