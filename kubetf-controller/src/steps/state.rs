use super::StatusStep;
use crate::conditions::{
    backup_failed, backup_ok, restore_failed, restore_ok, BACKUP_SUCCESSFUL_REASON,
    BUCKET_NOT_FOUND_REASON, CLIENT_UNAVAILABLE_REASON, NOTHING_TO_RESTORE_REASON,
    RESTORE_SUCCESSFUL_REASON, UNEXPECTED_ERROR_REASON,
};
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use kubetf_backup::{BlobError, BlobStore, State};
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{Output, Secret, Workspace};
use std::sync::Arc;
use tracing::{info, warn};

/// Shown in place of outputs terraform marks as sensitive
pub const SENSITIVE_PLACEHOLDER: &str = "<sensitive>";

/// Observe the state secret, surface its outputs and keep the backup bucket
/// in step with it. Restores the secret from the bucket when it is missing.
pub struct StateStep {
    secrets: Api<Secret>,
    backups: Option<Arc<dyn BlobStore>>,
}

impl StateStep {
    pub fn new(store: Arc<dyn ObjectStore>, backups: Option<Arc<dyn BlobStore>>) -> Self {
        Self {
            secrets: Api::new(store),
            backups,
        }
    }

    fn backup_store(&self, bucket: &str) -> Result<&dyn BlobStore> {
        self.backups
            .as_deref()
            .ok_or_else(|| ReconcileError::BackupStoreUnavailable(bucket.to_string()))
    }

    async fn observe(&self, ws: &mut Workspace, mut secret: Secret) -> Result<()> {
        if secret.metadata.set_owner_reference(ws.owner_reference()) {
            secret = self.secrets.update(&secret).await?;
        }

        let state = State::from_secret(&secret)?;
        ws.status.outputs = outputs(&state);

        if ws.spec.backup_bucket.is_empty() || state.serial == ws.status.backup_serial {
            return Ok(());
        }

        match self.backup(ws, &secret).await {
            Ok(()) => {
                info!(
                    serial = state.serial,
                    previous = ws.status.backup_serial,
                    "Backed up state"
                );
                ws.status.backup_serial = state.serial;
                backup_ok(
                    &mut ws.status,
                    BACKUP_SUCCESSFUL_REASON,
                    "State was successfully backed up",
                );
                Ok(())
            }
            Err(e) => {
                let reason = failure_reason(&e);
                warn!(reason, "Backup failed: {}", e);
                backup_failed(&mut ws.status, reason, &e.to_string());
                Err(e)
            }
        }
    }

    async fn backup(&self, ws: &Workspace, secret: &Secret) -> Result<()> {
        let bucket = &ws.spec.backup_bucket;
        let backups = self.backup_store(bucket)?;

        if !backups.bucket_exists(bucket).await? {
            return Err(BlobError::BucketNotFound(bucket.clone()).into());
        }

        let data = serde_yaml_ng::to_string(secret)?;
        backups
            .write_object(bucket, &ws.backup_object_name(), data.into_bytes())
            .await?;
        Ok(())
    }

    async fn restore(&self, ws: &mut Workspace) -> Result<()> {
        match self.restore_secret(ws).await {
            Ok(Some(secret)) => {
                info!("Restored state secret {} from backup", secret.metadata.name);
                restore_ok(
                    &mut ws.status,
                    RESTORE_SUCCESSFUL_REASON,
                    "State was successfully restored",
                );
                Ok(())
            }
            Ok(None) => {
                restore_ok(
                    &mut ws.status,
                    NOTHING_TO_RESTORE_REASON,
                    "No backup was found to restore",
                );
                Ok(())
            }
            Err(e) => {
                let reason = failure_reason(&e);
                warn!(reason, "Restore failed: {}", e);
                restore_failed(&mut ws.status, reason, &e.to_string());
                Err(e)
            }
        }
    }

    /// Recreate the state secret from its backup; `None` if there is none
    async fn restore_secret(&self, ws: &Workspace) -> Result<Option<Secret>> {
        let bucket = &ws.spec.backup_bucket;
        let backups = self.backup_store(bucket)?;

        if !backups.bucket_exists(bucket).await? {
            return Err(BlobError::BucketNotFound(bucket.clone()).into());
        }

        let data = match backups.read_object(bucket, &ws.backup_object_name()).await {
            Ok(data) => data,
            Err(e) if e.is_object_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut secret: Secret = serde_yaml_ng::from_slice(&data)?;
        // must not carry a resource version on create
        secret.metadata.resource_version = None;
        let created = self.secrets.create(&secret).await?;
        Ok(Some(created))
    }
}

#[async_trait]
impl StatusStep for StateStep {
    fn name(&self) -> &'static str {
        "state"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        let key = ws.child_key(ws.state_secret_name());
        match self.secrets.get_opt(&key).await? {
            Some(secret) => self.observe(ws, secret).await,
            None if ws.spec.backup_bucket.is_empty() => Ok(()),
            None => self.restore(ws).await,
        }
    }
}

fn failure_reason(err: &ReconcileError) -> &'static str {
    match err {
        ReconcileError::Blob(e) if e.is_bucket_not_found() => BUCKET_NOT_FOUND_REASON,
        ReconcileError::BackupStoreUnavailable(_) => CLIENT_UNAVAILABLE_REASON,
        _ => UNEXPECTED_ERROR_REASON,
    }
}

/// Status outputs, sorted by key, with sensitive values redacted
fn outputs(state: &State) -> Vec<Output> {
    state
        .outputs
        .iter()
        .map(|(key, output)| Output {
            key: key.clone(),
            value: if output.sensitive {
                SENSITIVE_PLACEHOLDER.to_string()
            } else {
                match &output.value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            },
        })
        .collect()
}
