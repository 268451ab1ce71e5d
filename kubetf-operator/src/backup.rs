use crate::config::{BackupConfig, BackupProvider};
use anyhow::{Context, Result};
use kubetf_backup::{BlobStore, FsBlobStore, GcsBlobStore};
use std::sync::Arc;
use tracing::info;

/// Build the backup store once at startup; `None` when backups are disabled
pub fn backup_store(config: &BackupConfig) -> Result<Option<Arc<dyn BlobStore>>> {
    let store: Arc<dyn BlobStore> = match config.provider {
        BackupProvider::None => {
            info!("State backups disabled");
            return Ok(None);
        }
        BackupProvider::Fs => {
            std::fs::create_dir_all(&config.dir).with_context(|| {
                format!("Failed to create backup directory {}", config.dir.display())
            })?;
            Arc::new(FsBlobStore::new(&config.dir))
        }
        BackupProvider::Gcs => Arc::new(
            GcsBlobStore::new(&config.gcs_endpoint, config.gcs_token.clone())
                .context("Failed to create GCS client")?,
        ),
    };

    info!("Backing up state to {} storage", store.name());
    Ok(Some(store))
}
