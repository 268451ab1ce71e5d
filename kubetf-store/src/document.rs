// Bookkeeping rules shared by every store implementation

use crate::error::{Result, StoreError};
use crate::UpdateScope;
use kubetf_types::ObjectKey;
use serde_json::{Map, Value};
use uuid::Uuid;

pub(crate) fn key_of(kind: &str, object: &Value) -> Result<ObjectKey> {
    let meta = object
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::invalid(kind, "object has no metadata"))?;

    let name = meta
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StoreError::invalid(kind, "metadata.name is required"))?;

    if name.contains('/') || name == "." || name == ".." {
        return Err(StoreError::invalid(kind, format!("invalid name '{name}'")));
    }

    let namespace = meta.get("namespace").and_then(Value::as_str).unwrap_or("");
    Ok(ObjectKey::new(namespace, name))
}

pub(crate) fn resource_version(object: &Value) -> Option<&str> {
    object
        .get("metadata")
        .and_then(|m| m.get("resourceVersion"))
        .and_then(Value::as_str)
}

fn metadata_mut<'a>(kind: &str, object: &'a mut Value) -> Result<&'a mut Map<String, Value>> {
    object
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::invalid(kind, "object has no metadata"))
}

/// Stamp a new object with a uid and its first resource version
pub(crate) fn prepare_create(kind: &str, mut object: Value, version: u64) -> Result<Value> {
    if resource_version(&object).is_some() {
        return Err(StoreError::invalid(
            kind,
            "resourceVersion should not be set on objects to be created",
        ));
    }

    let meta = metadata_mut(kind, &mut object)?;
    meta.insert("uid".to_string(), Value::String(Uuid::new_v4().to_string()));
    meta.insert(
        "resourceVersion".to_string(),
        Value::String(version.to_string()),
    );
    Ok(object)
}

/// Merge an update into the stored object after the optimistic concurrency
/// check
pub(crate) fn prepare_update(
    kind: &str,
    current: &Value,
    incoming: Value,
    scope: UpdateScope,
    version: u64,
) -> Result<Value> {
    let key = key_of(kind, &incoming)?;

    match resource_version(&incoming) {
        None => {
            return Err(StoreError::invalid(
                kind,
                "metadata.resourceVersion must be specified for an update",
            ))
        }
        Some(v) if Some(v) != resource_version(current) => {
            return Err(StoreError::Conflict {
                kind: kind.to_string(),
                key,
            })
        }
        Some(_) => {}
    }

    let mut merged = match scope {
        UpdateScope::Object => {
            let mut merged = incoming;
            replace_field(&mut merged, current, "status");
            if let (Some(meta), Some(uid)) = (
                merged.get_mut("metadata").and_then(Value::as_object_mut),
                current.get("metadata").and_then(|m| m.get("uid")),
            ) {
                meta.insert("uid".to_string(), uid.clone());
            }
            merged
        }
        UpdateScope::Status => {
            let mut merged = current.clone();
            replace_field(&mut merged, &incoming, "status");
            merged
        }
    };

    metadata_mut(kind, &mut merged)?.insert(
        "resourceVersion".to_string(),
        Value::String(version.to_string()),
    );
    Ok(merged)
}

fn replace_field(target: &mut Value, source: &Value, field: &str) {
    let Some(target) = target.as_object_mut() else {
        return;
    };
    match source.get(field) {
        Some(value) => {
            target.insert(field.to_string(), value.clone());
        }
        None => {
            target.remove(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_rejects_resource_version() {
        let object = json!({"metadata": {"name": "a", "namespace": "default", "resourceVersion": "7"}});
        let err = prepare_create("Secret", object, 1).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[test]
    fn test_update_conflicts_on_stale_version() {
        let current = json!({"metadata": {"name": "a", "namespace": "default", "resourceVersion": "2"}});
        let incoming = json!({"metadata": {"name": "a", "namespace": "default", "resourceVersion": "1"}});

        let err = prepare_update("Workspace", &current, incoming, UpdateScope::Object, 3).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_object_update_keeps_stored_status() {
        let current = json!({
            "metadata": {"name": "a", "namespace": "default", "resourceVersion": "2", "uid": "u1"},
            "spec": {"backupBucket": ""},
            "status": {"queue": ["apply-1"]}
        });
        let incoming = json!({
            "metadata": {"name": "a", "namespace": "default", "resourceVersion": "2"},
            "spec": {"backupBucket": "backups"},
            "status": {"queue": []}
        });

        let merged = prepare_update("Workspace", &current, incoming, UpdateScope::Object, 3)
            .expect("update should succeed");

        assert_eq!(merged["spec"]["backupBucket"], "backups");
        assert_eq!(merged["status"]["queue"], json!(["apply-1"]));
        assert_eq!(merged["metadata"]["uid"], "u1");
        assert_eq!(merged["metadata"]["resourceVersion"], "3");
    }

    #[test]
    fn test_status_update_leaves_spec_alone() {
        let current = json!({
            "metadata": {"name": "a", "namespace": "default", "resourceVersion": "2"},
            "spec": {"backupBucket": "backups"},
        });
        let incoming = json!({
            "metadata": {"name": "a", "namespace": "default", "resourceVersion": "2"},
            "spec": {"backupBucket": "other"},
            "status": {"phase": "Ready"}
        });

        let merged = prepare_update("Workspace", &current, incoming, UpdateScope::Status, 3)
            .expect("status update should succeed");

        assert_eq!(merged["spec"]["backupBucket"], "backups");
        assert_eq!(merged["status"]["phase"], "Ready");
    }
}
