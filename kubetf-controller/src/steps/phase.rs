use super::StatusStep;
use crate::error::Result;
use crate::phase::aggregate_phase;
use async_trait::async_trait;
use kubetf_types::Workspace;

/// Summarize the conditions recorded by the earlier steps
pub struct PhaseStep;

#[async_trait]
impl StatusStep for PhaseStep {
    fn name(&self) -> &'static str {
        "phase"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        ws.status.phase = aggregate_phase(&ws.status.conditions);
        Ok(())
    }
}
