use super::{ensure, Ensured, StatusStep};
use crate::builders;
use crate::conditions::{pod_failed, pod_ok, pod_unknown, PENDING_REASON};
use crate::error::Result;
use async_trait::async_trait;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{Pod, PodPhase, Workspace};
use std::sync::Arc;

/// The workspace's long-running pod
pub struct PodStep {
    pods: Api<Pod>,
    image: String,
}

impl PodStep {
    pub fn new(store: Arc<dyn ObjectStore>, image: impl Into<String>) -> Self {
        Self {
            pods: Api::new(store),
            image: image.into(),
        }
    }
}

#[async_trait]
impl StatusStep for PodStep {
    fn name(&self) -> &'static str {
        "pod"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        let pod = match ensure(&self.pods, builders::workspace_pod(ws, &self.image)).await? {
            Ensured::Created => {
                pod_ok(&mut ws.status, PENDING_REASON, "Creating pod");
                return Ok(());
            }
            Ensured::Existing(pod) => pod,
        };

        let phase = pod.status.phase.unwrap_or(PodPhase::Unknown);
        let reason = phase.as_str();
        match phase {
            PodPhase::Running => pod_ok(&mut ws.status, reason, "Pod is running"),
            PodPhase::Pending => pod_ok(&mut ws.status, PENDING_REASON, "Pod is pending"),
            PodPhase::Failed => pod_failed(&mut ws.status, reason, "Pod failed"),
            PodPhase::Succeeded => pod_failed(&mut ws.status, reason, "Pod unexpectedly exited"),
            PodPhase::Unknown => pod_unknown(&mut ws.status, reason, "Pod state is unknown"),
        }
        Ok(())
    }
}
