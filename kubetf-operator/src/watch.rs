//! Change detection over the object store
//!
//! The store has no watch API, so the operator lists the watched kinds on
//! every poll and compares them with what it saw last time. Every object
//! that appeared, changed or vanished maps to at most one workspace.

use kubetf_controller::mapping::{owned_to_workspace, run_to_workspace, state_secret_to_workspace};
use kubetf_store::{Api, ObjectStore, Result};
use kubetf_types::{
    ConfigMap, ObjectKey, PersistentVolumeClaim, Pod, Resource, Run, Secret, Workspace,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    fingerprint: String,
    target: Option<ObjectKey>,
}

pub struct ChangeWatcher {
    workspaces: Api<Workspace>,
    runs: Api<Run>,
    secrets: Api<Secret>,
    pods: Api<Pod>,
    claims: Api<PersistentVolumeClaim>,
    config_maps: Api<ConfigMap>,
    seen: HashMap<(&'static str, ObjectKey), Seen>,
}

impl ChangeWatcher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            workspaces: Api::new(store.clone()),
            runs: Api::new(store.clone()),
            secrets: Api::new(store.clone()),
            pods: Api::new(store.clone()),
            claims: Api::new(store.clone()),
            config_maps: Api::new(store),
            seen: HashMap::new(),
        }
    }

    /// Workspaces affected by changes since the previous call
    pub async fn changed(&mut self) -> Result<BTreeSet<ObjectKey>> {
        let mut current = HashMap::new();

        for ws in self.workspaces.list_all().await? {
            let key = ws.key();
            let entry = Seen {
                fingerprint: workspace_fingerprint(&ws),
                target: Some(key.clone()),
            };
            current.insert((Workspace::KIND, key), entry);
        }
        for run in self.runs.list_all().await? {
            let target = run_to_workspace(&run);
            current.insert((Run::KIND, run.key()), seen(&run, target));
        }
        for secret in self.secrets.list_all().await? {
            let target = state_secret_to_workspace(&secret);
            current.insert((Secret::KIND, secret.key()), seen(&secret, target));
        }
        for pod in self.pods.list_all().await? {
            let target = owned_to_workspace(&pod.metadata);
            current.insert((Pod::KIND, pod.key()), seen(&pod, target));
        }
        for claim in self.claims.list_all().await? {
            let target = owned_to_workspace(&claim.metadata);
            current.insert((PersistentVolumeClaim::KIND, claim.key()), seen(&claim, target));
        }
        for config_map in self.config_maps.list_all().await? {
            let target = owned_to_workspace(&config_map.metadata);
            current.insert((ConfigMap::KIND, config_map.key()), seen(&config_map, target));
        }

        let mut affected = BTreeSet::new();
        for (id, now) in &current {
            if self.seen.get(id) != Some(now) {
                affected.extend(now.target.clone());
                // an object moved to another workspace changes the old one too
                if let Some(before) = self.seen.get(id) {
                    affected.extend(before.target.clone());
                }
            }
        }
        for (id, before) in &self.seen {
            if !current.contains_key(id) {
                affected.extend(before.target.clone());
            }
        }

        self.seen = current;
        Ok(affected)
    }
}

fn seen<T: Resource>(object: &T, target: Option<ObjectKey>) -> Seen {
    Seen {
        fingerprint: object.meta().resource_version.clone().unwrap_or_default(),
        target,
    }
}

/// Everything but status and resource version, so the reconciler's own
/// status writes do not trigger another reconcile
fn workspace_fingerprint(ws: &Workspace) -> String {
    let mut metadata = ws.metadata.clone();
    metadata.resource_version = None;
    serde_json::to_string(&(&metadata, &ws.spec)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubetf_controller::builders;
    use kubetf_store::MemoryStore;
    use kubetf_types::RunPhase;

    #[tokio::test]
    async fn test_reports_new_changed_and_deleted_objects() {
        let store = MemoryStore::shared();
        let mut watcher = ChangeWatcher::new(store.clone());
        assert!(watcher.changed().await.expect("list").is_empty());

        store
            .seed(Workspace::new("dev", "network"))
            .await
            .expect("Failed to seed workspace");
        let run = store
            .seed(Run::new("dev", "apply-1", "apply", "database"))
            .await
            .expect("Failed to seed run");

        let changed = watcher.changed().await.expect("list");
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![ObjectKey::new("dev", "database"), ObjectKey::new("dev", "network")]
        );
        assert!(watcher.changed().await.expect("list").is_empty());

        let runs = Api::<Run>::new(store.clone());
        let mut run = run;
        run.phase = RunPhase::Completed;
        runs.update(&run).await.expect("Failed to update run");
        let changed = watcher.changed().await.expect("list");
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![ObjectKey::new("dev", "database")]
        );

        runs.delete(&run.key()).await.expect("Failed to delete run");
        let changed = watcher.changed().await.expect("list");
        assert!(changed.contains(&ObjectKey::new("dev", "database")));
    }

    #[tokio::test]
    async fn test_status_writes_are_not_changes() {
        let store = MemoryStore::shared();
        let mut ws = store
            .seed(Workspace::new("dev", "network"))
            .await
            .expect("Failed to seed workspace");
        let mut watcher = ChangeWatcher::new(store.clone());
        watcher.changed().await.expect("list");

        ws.status.queue.push("apply-1".to_string());
        Api::<Workspace>::new(store.clone())
            .update_status(&ws)
            .await
            .expect("Failed to update status");

        assert!(watcher.changed().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_deleted_variables_config_map_maps_to_owner() {
        let store = MemoryStore::shared();
        let ws = store
            .seed(Workspace::new("dev", "network"))
            .await
            .expect("Failed to seed workspace");
        let config_map = store
            .seed(builders::variables_config_map(&ws))
            .await
            .expect("Failed to seed config map");
        let mut watcher = ChangeWatcher::new(store.clone());
        watcher.changed().await.expect("list");

        Api::<ConfigMap>::new(store.clone())
            .delete(&config_map.key())
            .await
            .expect("Failed to delete config map");

        let changed = watcher.changed().await.expect("list");
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![ObjectKey::new("dev", "network")]
        );
    }
}
