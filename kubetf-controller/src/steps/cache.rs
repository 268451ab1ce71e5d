use super::{ensure, Ensured, StatusStep};
use crate::builders;
use crate::conditions::{cache_failed, cache_ok, CACHE_BOUND_REASON, CACHE_LOST_REASON, PENDING_REASON};
use crate::error::Result;
use async_trait::async_trait;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{ClaimPhase, PersistentVolumeClaim, Workspace};
use std::sync::Arc;

/// Persistent volume claim backing the terraform plugin and module cache
pub struct CacheStep {
    claims: Api<PersistentVolumeClaim>,
}

impl CacheStep {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            claims: Api::new(store),
        }
    }
}

#[async_trait]
impl StatusStep for CacheStep {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        let claim = match ensure(&self.claims, builders::cache_claim(ws)).await? {
            Ensured::Created => {
                cache_ok(&mut ws.status, PENDING_REASON, "PVC is being created");
                return Ok(());
            }
            Ensured::Existing(claim) => claim,
        };

        match claim.status.phase {
            Some(ClaimPhase::Bound) => cache_ok(
                &mut ws.status,
                CACHE_BOUND_REASON,
                "Cache's PVC successfully bound to PV",
            ),
            Some(ClaimPhase::Lost) => cache_failed(
                &mut ws.status,
                CACHE_LOST_REASON,
                "Persistent volume does not exist any longer",
            ),
            Some(ClaimPhase::Pending) => {
                cache_ok(&mut ws.status, PENDING_REASON, "Cache's PVC in pending state")
            }
            Some(ClaimPhase::Unknown) | None => {}
        }
        Ok(())
    }
}
