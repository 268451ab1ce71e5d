use crate::condition::{self, Condition, ConditionStatus};
use crate::meta::{impl_resource, ObjectKey, ObjectMeta, OwnerReference, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which the state secret stores the compressed state file
pub const STATE_SECRET_KEY: &str = "tfstate";

/// Name prefix of state secrets written by terraform's kubernetes backend
pub const STATE_SECRET_PREFIX: &str = "tfstate-default-";

/// Long-lived unit bound to one backend, cache volume and state file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WorkspaceSpec,
    #[serde(default)]
    pub status: WorkspaceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSpec {
    #[serde(default = "default_service_account")]
    pub service_account_name: String,

    /// Secret exposed to terraform as environment variables
    #[serde(default)]
    pub secret_name: String,

    #[serde(default)]
    pub cache: CacheSpec,

    #[serde(default)]
    pub backend: BackendSpec,

    /// Remote bucket for state backups; empty disables backup and restore
    #[serde(default)]
    pub backup_bucket: String,

    /// How long a client waits for the workspace to become ready
    #[serde(default = "default_timeout_client")]
    pub timeout_client: String,
}

fn default_service_account() -> String {
    "default".to_string()
}

fn default_timeout_client() -> String {
    "10s".to_string()
}

impl Default for WorkspaceSpec {
    fn default() -> Self {
        Self {
            service_account_name: default_service_account(),
            secret_name: String::new(),
            cache: CacheSpec::default(),
            backend: BackendSpec::default(),
            backup_bucket: String::new(),
            timeout_client: default_timeout_client(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSpec {
    #[serde(default = "default_cache_size")]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

fn default_cache_size() -> String {
    "1Gi".to_string()
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            size: default_cache_size(),
            storage_class: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

fn default_backend_type() -> String {
    "local".to_string()
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            config: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub phase: WorkspacePhase,

    /// Mutating runs waiting for the workspace, in arrival order
    #[serde(default)]
    pub queue: Vec<String>,

    /// Run currently allowed to execute; set by the run scheduler, not here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,

    #[serde(default)]
    pub outputs: Vec<Output>,

    /// Serial of the state file last written to the backup bucket
    #[serde(default)]
    pub backup_serial: i64,
}

impl WorkspaceStatus {
    pub fn set_condition(
        &mut self,
        r#type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        condition::set_condition(
            &mut self.conditions,
            Condition::new(r#type, status, reason, message),
        );
    }

    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        condition::find_condition(&self.conditions, r#type)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspacePhase {
    Ready,
    Initializing,
    #[default]
    Unknown,
    Error,
    Deleting,
}

impl fmt::Display for WorkspacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkspacePhase::Ready => "Ready",
            WorkspacePhase::Initializing => "Initializing",
            WorkspacePhase::Unknown => "Unknown",
            WorkspacePhase::Error => "Error",
            WorkspacePhase::Deleting => "Deleting",
        };
        f.write_str(s)
    }
}

/// Terraform output surfaced on the workspace status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub key: String,
    pub value: String,
}

impl Workspace {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn pod_name(&self) -> String {
        format!("workspace-{}", self.name())
    }

    pub fn pvc_name(&self) -> String {
        format!("workspace-{}-cache", self.name())
    }

    pub fn variables_config_map_name(&self) -> String {
        format!("workspace-{}-variables", self.name())
    }

    /// Name shared by the workspace's role and role binding
    pub fn rbac_name(&self) -> String {
        format!("workspace-{}", self.name())
    }

    /// Secret written by terraform's kubernetes backend
    pub fn state_secret_name(&self) -> String {
        format!("{}{}", STATE_SECRET_PREFIX, self.name())
    }

    pub fn backup_object_name(&self) -> String {
        format!("{}/{}.yaml", self.namespace(), self.name())
    }

    /// Key of an object named `name` in the workspace's namespace
    pub fn child_key(&self, name: impl Into<String>) -> ObjectKey {
        ObjectKey::new(self.namespace(), name)
    }

    /// Owner reference for objects the workspace controls
    pub fn controller_reference(&self) -> OwnerReference {
        OwnerReference {
            controller: Some(true),
            block_owner_deletion: Some(true),
            ..self.owner_reference()
        }
    }

    /// Owner reference for objects the workspace owns without controlling
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: Self::API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            name: self.name().to_string(),
            uid: self.metadata.uid.clone(),
            controller: None,
            block_owner_deletion: None,
        }
    }
}

impl_resource!(Workspace, "Workspace", crate::API_VERSION);
