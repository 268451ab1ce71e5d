use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubetf_controller::{Outcome, Reconciler};
use kubetf_logging::{init_subscriber, LogSettings};
use kubetf_operator::backup::backup_store;
use kubetf_operator::{Config, Controller, ControllerSettings};
use kubetf_store::{FileStore, ObjectStore};
use kubetf_types::ObjectKey;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "kubetf")]
#[command(about = "Runs terraform workspaces as cluster resources")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to an operator configuration file
    #[arg(short, long, global = true, env = "KUBETF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the object store
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Image for workspace pods
    #[arg(long, global = true)]
    image: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the controller until interrupted
    Run,
    /// Reconcile one workspace and exit
    Reconcile {
        #[arg(short, long, default_value = "default")]
        namespace: String,
        /// Workspace name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_subscriber(&LogSettings::from_env());
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.store_dir {
        config.store_dir = dir;
    }
    if let Some(image) = args.image {
        config.image = image;
    }
    info!(
        "Configuration loaded: store_dir={}, image={}",
        config.store_dir.display(),
        config.image
    );

    std::fs::create_dir_all(&config.store_dir).with_context(|| {
        format!("Failed to create store directory {}", config.store_dir.display())
    })?;
    let store: Arc<dyn ObjectStore> = Arc::new(FileStore::new(&config.store_dir));

    let mut builder = Reconciler::builder(store.clone())
        .image(config.image.clone())
        .retry_delay(config.retry_delay());
    if let Some(backups) = backup_store(&config.backup)? {
        builder = builder.backup_store(backups);
    }
    let reconciler = builder.build();

    match args.command {
        Command::Run => {
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, shutting down");
                }
                signal.cancel();
            });

            let controller = Controller::new(store, reconciler, ControllerSettings::from(&config));
            controller.run(shutdown).await;
        }
        Command::Reconcile { namespace, name } => {
            let key = ObjectKey::new(namespace, name);
            match reconciler.reconcile_outcome(&key).await {
                Outcome::Done => info!("Reconciled {}", key),
                outcome => {
                    warn!("Reconcile of {} did not complete: {:?}", key, outcome);
                    anyhow::bail!("reconcile of {key} failed");
                }
            }
        }
    }

    Ok(())
}
