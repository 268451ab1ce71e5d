//! Status pipeline steps
//!
//! Each step looks at one aspect of the workspace, creates what is missing
//! and records what it observed on the workspace status. Steps run in a
//! fixed order and the pipeline stops at the first failure.

mod cache;
mod phase;
mod pod;
mod queue;
mod rbac;
mod state;
mod variables;

pub use cache::CacheStep;
pub use phase::PhaseStep;
pub use pod::PodStep;
pub use queue::QueueStep;
pub use rbac::RbacStep;
pub use state::StateStep;
pub use variables::VariablesStep;

use crate::error::Result;
use async_trait::async_trait;
use kubetf_store::Api;
use kubetf_types::{Resource, Workspace};
use tracing::info;

#[async_trait]
pub trait StatusStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bring one aspect of the workspace up to date, recording the outcome
    /// on `ws.status`
    async fn apply(&self, ws: &mut Workspace) -> Result<()>;
}

/// Result of [`ensure`]
pub(crate) enum Ensured<T> {
    Existing(T),
    Created,
}

/// Create `desired` unless an object with its key already exists
pub(crate) async fn ensure<T: Resource>(api: &Api<T>, desired: T) -> Result<Ensured<T>> {
    let key = desired.key();
    if let Some(existing) = api.get_opt(&key).await? {
        return Ok(Ensured::Existing(existing));
    }

    api.create(&desired).await?;
    info!("Created {} {}", T::KIND, key);
    Ok(Ensured::Created)
}
