use crate::meta::{impl_resource, ObjectMeta};
use serde::{Deserialize, Serialize};

/// Prefix of workspace annotations that record an approved run
pub const APPROVAL_ANNOTATION_PREFIX: &str = "approvals.kubetf.dev/";

/// One execution of a terraform command against a workspace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub metadata: ObjectMeta,

    /// Terraform command, e.g. `plan`, `apply`, `destroy`
    #[serde(default)]
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Name of the workspace in the same namespace
    #[serde(default)]
    pub workspace: String,

    #[serde(default)]
    pub phase: RunPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    Pending,
    Queued,
    Provisioning,
    Running,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Whether a command may mutate state, and therefore needs exclusive access
/// to its workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    Plan,
    Mutating,
}

impl Run {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        command: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            command: command.into(),
            workspace: workspace.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn command_class(&self) -> CommandClass {
        if self.command == "plan" {
            CommandClass::Plan
        } else {
            CommandClass::Mutating
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    pub fn belongs_to(&self, workspace: &str) -> bool {
        !self.workspace.is_empty() && self.workspace == workspace
    }

    /// Workspace annotation key recording approval of this run
    pub fn approval_annotation_key(&self) -> String {
        format!("{}{}", APPROVAL_ANNOTATION_PREFIX, self.metadata.name)
    }
}

impl_resource!(Run, "Run", crate::API_VERSION);
