use super::{ensure, StatusStep};
use crate::builders;
use crate::error::Result;
use async_trait::async_trait;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{ConfigMap, Workspace};
use std::sync::Arc;

/// Config map with the workspace's rendered backend configuration
pub struct VariablesStep {
    config_maps: Api<ConfigMap>,
}

impl VariablesStep {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config_maps: Api::new(store),
        }
    }
}

#[async_trait]
impl StatusStep for VariablesStep {
    fn name(&self) -> &'static str {
        "variables"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        ensure(&self.config_maps, builders::variables_config_map(ws)).await?;
        Ok(())
    }
}
