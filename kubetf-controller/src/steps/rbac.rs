use super::{ensure, StatusStep};
use crate::builders;
use crate::error::Result;
use async_trait::async_trait;
use kubetf_store::{Api, ObjectStore};
use kubetf_types::{Role, RoleBinding, Workspace};
use std::sync::Arc;

/// Role and binding granting the workspace's service account what runs need
pub struct RbacStep {
    roles: Api<Role>,
    bindings: Api<RoleBinding>,
}

impl RbacStep {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            roles: Api::new(store.clone()),
            bindings: Api::new(store),
        }
    }
}

#[async_trait]
impl StatusStep for RbacStep {
    fn name(&self) -> &'static str {
        "rbac"
    }

    async fn apply(&self, ws: &mut Workspace) -> Result<()> {
        ensure(&self.roles, builders::role(ws)).await?;
        ensure(&self.bindings, builders::role_binding(ws)).await?;
        Ok(())
    }
}
