//! Map watched objects to the workspace that should be reconciled

use kubetf_types::{ObjectKey, ObjectMeta, Resource, Run, Secret, Workspace, STATE_SECRET_PREFIX};

/// Label terraform's kubernetes backend puts on state secrets
pub const STATE_SECRET_LABEL: &str = "tfstate";

/// A run affects the queue of the workspace it names
pub fn run_to_workspace(run: &Run) -> Option<ObjectKey> {
    if run.workspace.is_empty() {
        return None;
    }
    Some(ObjectKey::new(&run.metadata.namespace, &run.workspace))
}

/// Objects the workspace controls map back to it
pub fn owned_to_workspace(meta: &ObjectMeta) -> Option<ObjectKey> {
    meta.controller_owner()
        .filter(|owner| owner.kind == Workspace::KIND)
        .map(|owner| ObjectKey::new(&meta.namespace, &owner.name))
}

/// State secrets are named after their workspace
pub fn state_secret_to_workspace(secret: &Secret) -> Option<ObjectKey> {
    let meta = &secret.metadata;
    if meta.labels.get(STATE_SECRET_LABEL).map(String::as_str) != Some("true") {
        return None;
    }
    meta.name
        .strip_prefix(STATE_SECRET_PREFIX)
        .filter(|name| !name.is_empty())
        .map(|name| ObjectKey::new(&meta.namespace, name))
}
