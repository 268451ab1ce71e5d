//! End-to-end reconcile tests against the in-memory store

use kubetf_controller::{Outcome, Reconciler};
use kubetf_store::{Api, MemoryStore, ObjectStore, UpdateScope};
use kubetf_types::condition::{CACHE_FAILURE, POD_FAILURE};
use kubetf_types::{
    ClaimPhase, ConditionStatus, ConfigMap, ObjectKey, PersistentVolumeClaim, Pod, PodPhase, Role,
    Resource, RoleBinding, Run, RunPhase, Workspace, WorkspacePhase, FINALIZER_DELETE_DEPENDENTS,
};
use std::sync::Arc;

struct Fixture {
    store: Arc<MemoryStore>,
    reconciler: Reconciler,
    key: ObjectKey,
}

impl Fixture {
    async fn new(ws: Workspace) -> Self {
        let store = MemoryStore::shared();
        let key = ObjectKey::new(ws.namespace(), ws.name());
        store.seed(ws).await.expect("Failed to seed workspace");
        let reconciler = Reconciler::builder(store.clone())
            .image("kubetf:test")
            .build();
        Self {
            store,
            reconciler,
            key,
        }
    }

    async fn reconcile(&self) {
        self.reconciler
            .reconcile(&self.key)
            .await
            .expect("Failed to reconcile");
    }

    async fn workspace(&self) -> Workspace {
        Api::<Workspace>::new(self.store.clone())
            .get(&self.key)
            .await
            .expect("Failed to get workspace")
    }

    async fn seed_run(&self, name: &str, command: &str, phase: RunPhase) {
        let mut run = Run::new(&self.key.namespace, name, command, &self.key.name);
        run.phase = phase;
        self.store.seed(run).await.expect("Failed to seed run");
    }

    async fn set_run_phase(&self, name: &str, phase: RunPhase) {
        let runs = Api::<Run>::new(self.store.clone());
        let mut run = runs
            .get(&ObjectKey::new(&self.key.namespace, name))
            .await
            .expect("Failed to get run");
        run.phase = phase;
        runs.update(&run).await.expect("Failed to update run");
    }

    async fn set_claim_phase(&self, phase: ClaimPhase) {
        let claims = Api::<PersistentVolumeClaim>::new(self.store.clone());
        let key = ObjectKey::new(&self.key.namespace, "workspace-network-cache");
        let mut claim = claims.get(&key).await.expect("Failed to get claim");
        claim.status.phase = Some(phase);
        claims
            .update_status(&claim)
            .await
            .expect("Failed to update claim");
    }

    async fn set_pod_phase(&self, phase: PodPhase) {
        let pods = Api::<Pod>::new(self.store.clone());
        let key = ObjectKey::new(&self.key.namespace, "workspace-network");
        let mut pod = pods.get(&key).await.expect("Failed to get pod");
        pod.status.phase = Some(phase);
        pods.update_status(&pod).await.expect("Failed to update pod");
    }
}

#[tokio::test]
async fn test_new_workspace_creates_owned_resources() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;

    let store = &fixture.store;
    assert_eq!(store.count(ConfigMap::KIND).await, 1);
    assert_eq!(store.count(Role::KIND).await, 1);
    assert_eq!(store.count(RoleBinding::KIND).await, 1);
    assert_eq!(store.count(PersistentVolumeClaim::KIND).await, 1);
    assert_eq!(store.count(Pod::KIND).await, 1);

    let ws = fixture.workspace().await;
    assert!(ws.metadata.has_finalizer(FINALIZER_DELETE_DEPENDENTS));

    let cache = ws.status.condition(CACHE_FAILURE).expect("cache condition");
    assert_eq!(cache.status, ConditionStatus::False);
    assert_eq!(cache.reason, "Pending");

    let pod = ws.status.condition(POD_FAILURE).expect("pod condition");
    assert_eq!(pod.status, ConditionStatus::False);
    assert_eq!(pod.message, "Creating pod");

    assert_eq!(ws.status.phase, WorkspacePhase::Initializing);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;
    let first = fixture.workspace().await;

    fixture.reconcile().await;
    let second = fixture.workspace().await;

    assert_eq!(fixture.store.count(Pod::KIND).await, 1);
    assert_eq!(fixture.store.count(PersistentVolumeClaim::KIND).await, 1);
    assert_eq!(first.metadata.finalizers, second.metadata.finalizers);
    assert_eq!(first.status.conditions.len(), second.status.conditions.len());
}

#[tokio::test]
async fn test_bound_cache_and_running_pod_make_workspace_ready() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;

    fixture.set_claim_phase(ClaimPhase::Bound).await;
    fixture.set_pod_phase(PodPhase::Running).await;
    fixture.reconcile().await;

    let ws = fixture.workspace().await;
    assert_eq!(
        ws.status.condition(CACHE_FAILURE).map(|c| c.reason.as_str()),
        Some("CacheBound")
    );
    assert_eq!(
        ws.status.condition(POD_FAILURE).map(|c| c.reason.as_str()),
        Some("Running")
    );
    assert_eq!(ws.status.phase, WorkspacePhase::Ready);
}

#[tokio::test]
async fn test_lost_cache_is_an_error() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;

    fixture.set_claim_phase(ClaimPhase::Lost).await;
    fixture.set_pod_phase(PodPhase::Running).await;
    fixture.reconcile().await;

    let ws = fixture.workspace().await;
    let cache = ws.status.condition(CACHE_FAILURE).expect("cache condition");
    assert_eq!(cache.status, ConditionStatus::True);
    assert_eq!(cache.reason, "CacheLost");
    assert_eq!(ws.status.phase, WorkspacePhase::Error);
}

#[tokio::test]
async fn test_unrecognised_claim_phase_leaves_cache_condition() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;
    fixture.set_claim_phase(ClaimPhase::Bound).await;
    fixture.reconcile().await;
    let before = fixture.workspace().await;

    let key = ObjectKey::new(&fixture.key.namespace, "workspace-network-cache");
    let mut raw = fixture
        .store
        .get(PersistentVolumeClaim::KIND, &key)
        .await
        .expect("Failed to get claim");
    raw["status"] = serde_json::json!({ "phase": "Resizing" });
    fixture
        .store
        .update(PersistentVolumeClaim::KIND, raw, UpdateScope::Status)
        .await
        .expect("Failed to update claim");

    let outcome = fixture.reconciler.reconcile_outcome(&fixture.key).await;
    assert_eq!(outcome, Outcome::Done);

    let after = fixture.workspace().await;
    assert_eq!(
        after.status.condition(CACHE_FAILURE),
        before.status.condition(CACHE_FAILURE)
    );
    assert_eq!(after.status.phase, before.status.phase);
}

#[tokio::test]
async fn test_unknown_pod_phase_makes_workspace_unknown() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.reconcile().await;

    fixture.set_claim_phase(ClaimPhase::Bound).await;
    fixture.set_pod_phase(PodPhase::Unknown).await;
    fixture.reconcile().await;

    let ws = fixture.workspace().await;
    assert_eq!(
        ws.status.condition(POD_FAILURE).map(|c| c.status),
        Some(ConditionStatus::Unknown)
    );
    assert_eq!(ws.status.phase, WorkspacePhase::Unknown);
}

#[tokio::test]
async fn test_missing_workspace_is_done() {
    let store = MemoryStore::shared();
    let reconciler = Reconciler::builder(store).build();

    let outcome = reconciler
        .reconcile_outcome(&ObjectKey::new("dev", "gone"))
        .await;
    assert_eq!(outcome, Outcome::Done);
}

#[tokio::test]
async fn test_deleting_workspace_skips_pipeline() {
    let mut ws = Workspace::new("dev", "network");
    ws.metadata.deletion_timestamp = Some(chrono::Utc::now());
    let fixture = Fixture::new(ws).await;

    fixture.reconcile().await;

    let ws = fixture.workspace().await;
    assert_eq!(ws.status.phase, WorkspacePhase::Deleting);
    assert!(ws.status.conditions.is_empty());
    assert_eq!(fixture.store.count(Pod::KIND).await, 0);
    assert_eq!(fixture.store.count(ConfigMap::KIND).await, 0);
}

#[tokio::test]
async fn test_queue_follows_run_lifecycle() {
    let fixture = Fixture::new(Workspace::new("dev", "network")).await;
    fixture.seed_run("plan-1", "plan", RunPhase::Pending).await;
    fixture.seed_run("apply-1", "apply", RunPhase::Pending).await;
    fixture.reconcile().await;

    assert_eq!(fixture.workspace().await.status.queue, vec!["apply-1"]);

    fixture.seed_run("apply-2", "apply", RunPhase::Pending).await;
    fixture.reconcile().await;
    assert_eq!(
        fixture.workspace().await.status.queue,
        vec!["apply-1", "apply-2"]
    );

    fixture.set_run_phase("apply-1", RunPhase::Completed).await;
    fixture.reconcile().await;
    assert_eq!(fixture.workspace().await.status.queue, vec!["apply-2"]);
}

#[tokio::test]
async fn test_approvals_of_completed_runs_are_pruned() {
    let mut ws = Workspace::new("dev", "network");
    for run in ["apply-1", "apply-2", "apply-3"] {
        ws.metadata.annotations.insert(
            format!("approvals.kubetf.dev/{run}"),
            "approved".to_string(),
        );
    }
    ws.metadata
        .annotations
        .insert("team".to_string(), "platform".to_string());
    let fixture = Fixture::new(ws).await;
    fixture.seed_run("apply-1", "apply", RunPhase::Running).await;
    fixture.seed_run("apply-2", "apply", RunPhase::Completed).await;

    fixture.reconcile().await;

    let annotations = fixture.workspace().await.metadata.annotations;
    let keys: Vec<&str> = annotations.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["approvals.kubetf.dev/apply-1", "team"]);
}

#[tokio::test]
async fn test_steps_run_in_fixed_order() {
    let reconciler = Reconciler::builder(MemoryStore::shared()).build();
    assert_eq!(
        reconciler.step_names(),
        vec!["variables", "rbac", "state", "cache", "pod", "queue", "phase"]
    );
}
