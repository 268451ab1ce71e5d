use crate::document::{key_of, prepare_create, prepare_update, resource_version};
use crate::error::{Result, StoreError};
use crate::{ObjectStore, UpdateScope};
use async_trait::async_trait;
use kubetf_types::ObjectKey;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// File under the root holding the last resource version handed out
const REVISION_FILE: &str = ".revision";

/// Directory-backed store: `<root>/<kind>/<namespace>/<name>.yaml`
///
/// Writes are serialized within the process; the resource version check
/// still guards against stale reads. Resource versions come from one
/// store-wide counter, so a re-created object never reuses an old version.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn kind_dir(&self, kind: &str) -> PathBuf {
        self.root.join(kind.to_lowercase())
    }

    fn object_path(&self, kind: &str, key: &ObjectKey) -> PathBuf {
        self.kind_dir(kind)
            .join(namespace_dir(&key.namespace))
            .join(format!("{}.yaml", key.name))
    }

    async fn read(&self, kind: &str, key: &ObjectKey) -> Result<Value> {
        let path = self.object_path(kind, key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_yaml_ng::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(kind, key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, kind: &str, key: &ObjectKey, object: &Value) -> Result<()> {
        let path = self.object_path(kind, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling file first so readers never see a partial document
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, serde_yaml_ng::to_string(object)?).await?;
        fs::rename(&tmp, &path).await?;

        debug!(kind, %key, path = %path.display(), "Wrote object");
        Ok(())
    }

    /// Next value of the store-wide counter, at least one past `floor`.
    /// Callers hold `write_lock` and persist it with `save_revision`.
    async fn next_revision(&self, floor: u64) -> Result<u64> {
        let path = self.root.join(REVISION_FILE);
        let stored = match fs::read_to_string(&path).await {
            Ok(contents) => contents.trim().parse::<u64>().map_err(|e| {
                StoreError::invalid("revision", format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(stored.max(floor) + 1)
    }

    async fn save_revision(&self, revision: u64) -> Result<()> {
        let path = self.root.join(REVISION_FILE);
        fs::create_dir_all(&self.root).await?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, revision.to_string()).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_dir_sorted(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }
}

// Cluster-scoped objects live under a fixed directory name
fn namespace_dir(namespace: &str) -> &str {
    if namespace.is_empty() {
        "_cluster"
    } else {
        namespace
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get(&self, kind: &str, key: &ObjectKey) -> Result<Value> {
        self.read(kind, key).await
    }

    async fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<Value>> {
        let kind_dir = self.kind_dir(kind);
        let namespace_dirs = match namespace {
            Some(ns) => vec![kind_dir.join(namespace_dir(ns))],
            None => self.read_dir_sorted(&kind_dir).await?,
        };

        let mut objects = Vec::new();
        for dir in namespace_dirs {
            for path in self.read_dir_sorted(&dir).await? {
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                let contents = fs::read_to_string(&path).await?;
                objects.push(serde_yaml_ng::from_str(&contents)?);
            }
        }
        Ok(objects)
    }

    async fn create(&self, kind: &str, object: Value) -> Result<Value> {
        let key = key_of(kind, &object)?;
        let _guard = self.write_lock.lock().await;

        match self.read(kind, &key).await {
            Ok(_) => {
                return Err(StoreError::AlreadyExists {
                    kind: kind.to_string(),
                    key,
                })
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let revision = self.next_revision(0).await?;
        let created = prepare_create(kind, object, revision)?;
        self.save_revision(revision).await?;
        self.write(kind, &key, &created).await?;
        Ok(created)
    }

    async fn update(&self, kind: &str, object: Value, scope: UpdateScope) -> Result<Value> {
        let key = key_of(kind, &object)?;
        let _guard = self.write_lock.lock().await;

        let current = self.read(kind, &key).await?;
        let floor = resource_version(&current)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let revision = self.next_revision(floor).await?;
        let updated = prepare_update(kind, &current, object, scope, revision)?;
        self.save_revision(revision).await?;
        self.write(kind, &key, &updated).await?;
        Ok(updated)
    }

    async fn delete(&self, kind: &str, key: &ObjectKey) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.object_path(kind, key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(kind, key)),
            Err(e) => Err(e.into()),
        }
    }
}
