//! Resource model for the kubetf workspace operator
//!
//! Typed representations of the cluster objects the operator reads and writes:
//! the `Workspace` and `Run` custom resources plus the handful of core objects
//! (secrets, config maps, pods, claims, RBAC) a workspace owns.

pub mod condition;
pub mod meta;
pub mod objects;
pub mod run;
pub mod workspace;

pub use condition::{Condition, ConditionStatus};
pub use objects::{
    ClaimPhase, ConfigMap, Container, EnvFromSource, EnvVar, PersistentVolumeClaim, Pod,
    PodPhase, PodSpec, PodStatus, PolicyRule, PvcSpec, PvcStatus, Role, RoleBinding, RoleRef,
    Secret, Subject, Volume, VolumeMount,
};
pub use meta::{ObjectKey, ObjectMeta, OwnerReference, Resource};
pub use run::{CommandClass, Run, RunPhase, APPROVAL_ANNOTATION_PREFIX};
pub use workspace::{
    BackendSpec, CacheSpec, Output, Workspace, WorkspacePhase, WorkspaceSpec, WorkspaceStatus,
    STATE_SECRET_KEY, STATE_SECRET_PREFIX,
};

/// API group served by the operator's custom resources
pub const API_GROUP: &str = "kubetf.dev";

/// `apiVersion` of the custom resources
pub const API_VERSION: &str = "kubetf.dev/v1alpha1";

/// Finalizer requesting foreground cascading deletion of owned objects
pub const FINALIZER_DELETE_DEPENDENTS: &str = "foregroundDeletion";
