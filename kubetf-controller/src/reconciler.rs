use crate::approvals::{has_approvals, prune_approvals};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::steps::{
    CacheStep, PhaseStep, PodStep, QueueStep, RbacStep, StateStep, StatusStep, VariablesStep,
};
use crate::DEFAULT_IMAGE;
use kubetf_backup::BlobStore;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{ObjectKey, Run, Workspace, WorkspacePhase, FINALIZER_DELETE_DEPENDENTS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Drives one workspace at a time towards its declared state
pub struct Reconciler {
    workspaces: Api<Workspace>,
    runs: Api<Run>,
    steps: Vec<Box<dyn StatusStep>>,
    retry_delay: Duration,
}

pub struct ReconcilerBuilder {
    store: Arc<dyn ObjectStore>,
    image: String,
    backups: Option<Arc<dyn BlobStore>>,
    retry_delay: Duration,
}

impl ReconcilerBuilder {
    /// Image for workspace pods
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Blob store holding state backups. Without one, workspaces that name a
    /// backup bucket fail their backup and restore.
    pub fn backup_store(mut self, backups: Arc<dyn BlobStore>) -> Self {
        self.backups = Some(backups);
        self
    }

    /// Delay suggested for transient failures
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn build(self) -> Reconciler {
        let store = self.store;
        let steps: Vec<Box<dyn StatusStep>> = vec![
            Box::new(VariablesStep::new(store.clone())),
            Box::new(RbacStep::new(store.clone())),
            Box::new(StateStep::new(store.clone(), self.backups)),
            Box::new(CacheStep::new(store.clone())),
            Box::new(PodStep::new(store.clone(), self.image)),
            Box::new(QueueStep::new(store.clone())),
            Box::new(PhaseStep),
        ];

        Reconciler {
            workspaces: Api::new(store.clone()),
            runs: Api::new(store),
            steps,
            retry_delay: self.retry_delay,
        }
    }
}

impl Reconciler {
    pub fn builder(store: Arc<dyn ObjectStore>) -> ReconcilerBuilder {
        ReconcilerBuilder {
            store,
            image: DEFAULT_IMAGE.to_string(),
            backups: None,
            retry_delay: Duration::from_secs(10),
        }
    }

    /// Names of the status steps in the order they run
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Reconcile the workspace identified by `key`
    ///
    /// Whatever status the pipeline computed is persisted, also when a step
    /// fails part way. A workspace that no longer exists is not an error.
    #[instrument(skip_all, fields(workspace = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<()> {
        info!("Reconciling");

        let Some(mut ws) = self.workspaces.get_opt(key).await? else {
            debug!("Workspace no longer exists");
            return Ok(());
        };

        if ws.is_deleting() {
            if ws.status.phase != WorkspacePhase::Deleting {
                ws.status.phase = WorkspacePhase::Deleting;
                self.workspaces.update_status(&ws).await?;
            }
            return Ok(());
        }

        let mut spec_updated = ws.metadata.add_finalizer(FINALIZER_DELETE_DEPENDENTS);

        if has_approvals(&ws.metadata.annotations) {
            let runs = self.runs.list(ws.namespace()).await?;
            if let Some(annotations) = prune_approvals(&ws.metadata.annotations, &runs) {
                if annotations != ws.metadata.annotations {
                    ws.metadata.annotations = annotations;
                    spec_updated = true;
                }
            }
        }

        if spec_updated {
            ws = self.workspaces.update(&ws).await?;
        }

        let result = self.run_steps(&mut ws).await;
        self.workspaces.update_status(&ws).await?;
        result
    }

    /// Like [`Reconciler::reconcile`], classifying the result for a retry
    /// policy
    pub async fn reconcile_outcome(&self, key: &ObjectKey) -> Outcome {
        match self.reconcile(key).await {
            Ok(()) => Outcome::Done,
            Err(e) => e.outcome(self.retry_delay),
        }
    }

    async fn run_steps(&self, ws: &mut Workspace) -> Result<()> {
        for step in &self.steps {
            if let Err(e) = step.apply(ws).await {
                warn!(step = step.name(), "Status step failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}
