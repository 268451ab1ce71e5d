use super::StatusStep;
use crate::error::Result;
use crate::queue::compute_queue;
use async_trait::async_trait;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{Run, Workspace};
use std::sync::Arc;
use tracing::debug;

/// Order the mutating runs waiting for the workspace
pub struct QueueStep {
    runs: Api<Run>,
}

impl QueueStep {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            runs: Api::new(store),
        }
    }
}

#[async_trait]
impl StatusStep for QueueStep {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        let runs = self.runs.list(ws.namespace()).await?;
        let queue = compute_queue(&ws.status.queue, ws.name(), &runs);
        if queue != ws.status.queue {
            debug!(?queue, "Run queue changed");
        }
        ws.status.queue = queue;
        Ok(())
    }
}
