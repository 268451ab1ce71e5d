//! Resources owned by a workspace
//!
//! Every builder is a pure function of the workspace. The returned objects
//! carry a controller reference back to the workspace so deleting it takes
//! them along.

use kubetf_types::{
    ConfigMap, Container, EnvFromSource, EnvVar, ObjectMeta, PersistentVolumeClaim, Pod, PodSpec,
    PolicyRule, PvcSpec, Role, RoleBinding, RoleRef, Subject, Volume, VolumeMount, Workspace,
    API_GROUP,
};
use std::collections::BTreeMap;

/// Label carrying the name of the owning workspace
pub const WORKSPACE_LABEL: &str = "kubetf.dev/workspace";

/// Key of the rendered backend configuration in the variables config map
pub const BACKEND_CONFIG_KEY: &str = "backend.tf";

pub const WORKSPACE_CONTAINER: &str = "terraform";
pub const WORKING_DIR: &str = "/workspace";

const CACHE_VOLUME: &str = "cache";
const VARIABLES_VOLUME: &str = "variables";

fn owned_meta(ws: &Workspace, name: String) -> ObjectMeta {
    let mut meta = ObjectMeta::new(ws.namespace(), name);
    meta.labels = BTreeMap::from([
        (
            "app.kubernetes.io/managed-by".to_string(),
            "kubetf".to_string(),
        ),
        (WORKSPACE_LABEL.to_string(), ws.name().to_string()),
    ]);
    meta.owner_references.push(ws.controller_reference());
    meta
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Render the terraform backend block for the workspace
pub fn backend_config(ws: &Workspace) -> String {
    let backend = &ws.spec.backend;
    let mut out = format!("terraform {{\n  backend \"{}\" {{\n", backend.backend_type);
    for (key, value) in &backend.config {
        out.push_str(&format!("    {} = \"{}\"\n", key, value.replace('"', "\\\"")));
    }
    out.push_str("  }\n}\n");
    out
}

pub fn variables_config_map(ws: &Workspace) -> ConfigMap {
    ConfigMap {
        metadata: owned_meta(ws, ws.variables_config_map_name()),
        data: BTreeMap::from([(BACKEND_CONFIG_KEY.to_string(), backend_config(ws))]),
    }
}

/// Permissions the workspace's service account needs to run commands
pub fn role(ws: &Workspace) -> Role {
    Role {
        metadata: owned_meta(ws, ws.rbac_name()),
        rules: vec![
            PolicyRule {
                api_groups: strings(&[API_GROUP]),
                resources: strings(&["runs", "workspaces"]),
                verbs: strings(&["get", "list", "watch"]),
            },
            PolicyRule {
                api_groups: strings(&[""]),
                resources: strings(&["configmaps"]),
                verbs: strings(&["get", "create", "update"]),
            },
            // terraform's kubernetes backend keeps state in secrets and
            // locks it with leases
            PolicyRule {
                api_groups: strings(&[""]),
                resources: strings(&["secrets"]),
                verbs: strings(&["get", "list", "create", "update", "delete"]),
            },
            PolicyRule {
                api_groups: strings(&["coordination.k8s.io"]),
                resources: strings(&["leases"]),
                verbs: strings(&["get", "list", "create", "update", "delete"]),
            },
        ],
    }
}

pub fn role_binding(ws: &Workspace) -> RoleBinding {
    RoleBinding {
        metadata: owned_meta(ws, ws.rbac_name()),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: ws.rbac_name(),
        },
        subjects: vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: ws.spec.service_account_name.clone(),
            namespace: ws.namespace().to_string(),
        }],
    }
}

pub fn cache_claim(ws: &Workspace) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: owned_meta(ws, ws.pvc_name()),
        spec: PvcSpec {
            access_modes: strings(&["ReadWriteOnce"]),
            storage_class_name: ws.spec.cache.storage_class.clone(),
            storage: ws.spec.cache.size.clone(),
        },
        status: Default::default(),
    }
}

/// Long-running pod that initializes the backend and keeps the cache warm
pub fn workspace_pod(ws: &Workspace, image: &str) -> Pod {
    let mut env = vec![
        EnvVar {
            name: "TF_IN_AUTOMATION".to_string(),
            value: "true".to_string(),
        },
        EnvVar {
            name: "KUBETF_WORKSPACE".to_string(),
            value: ws.name().to_string(),
        },
        EnvVar {
            name: "KUBETF_TIMEOUT_CLIENT".to_string(),
            value: ws.spec.timeout_client.clone(),
        },
    ];
    env.sort_by(|a, b| a.name.cmp(&b.name));

    let env_from = if ws.spec.secret_name.is_empty() {
        Vec::new()
    } else {
        vec![EnvFromSource {
            secret_name: ws.spec.secret_name.clone(),
            optional: true,
        }]
    };

    let container = Container {
        name: WORKSPACE_CONTAINER.to_string(),
        image: image.to_string(),
        command: strings(&["kubetf", "workspace-server"]),
        args: vec![format!("--backend-config={}/{}", WORKING_DIR, BACKEND_CONFIG_KEY)],
        working_dir: Some(WORKING_DIR.to_string()),
        env,
        env_from,
        volume_mounts: vec![
            VolumeMount {
                name: CACHE_VOLUME.to_string(),
                mount_path: format!("{}/.terraform", WORKING_DIR),
                sub_path: None,
            },
            VolumeMount {
                name: VARIABLES_VOLUME.to_string(),
                mount_path: format!("{}/{}", WORKING_DIR, BACKEND_CONFIG_KEY),
                sub_path: Some(BACKEND_CONFIG_KEY.to_string()),
            },
        ],
    };

    Pod {
        metadata: owned_meta(ws, ws.pod_name()),
        spec: PodSpec {
            service_account_name: ws.spec.service_account_name.clone(),
            containers: vec![container],
            volumes: vec![
                Volume {
                    name: CACHE_VOLUME.to_string(),
                    claim_name: Some(ws.pvc_name()),
                    config_map_name: None,
                },
                Volume {
                    name: VARIABLES_VOLUME.to_string(),
                    claim_name: None,
                    config_map_name: Some(ws.variables_config_map_name()),
                },
            ],
            restart_policy: Some("Always".to_string()),
        },
        status: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new("dev", "network");
        ws.metadata.uid = Some("ws-uid".to_string());
        ws
    }

    #[test]
    fn test_backend_config_renders_type_and_settings() {
        let mut ws = workspace();
        ws.spec.backend.backend_type = "gcs".to_string();
        ws.spec.backend.config.insert("bucket".to_string(), "tf-state".to_string());
        ws.spec.backend.config.insert("prefix".to_string(), "dev".to_string());

        assert_eq!(
            backend_config(&ws),
            "terraform {\n  backend \"gcs\" {\n    bucket = \"tf-state\"\n    prefix = \"dev\"\n  }\n}\n"
        );
    }

    #[test]
    fn test_owned_objects_point_back_at_workspace() {
        let ws = workspace();
        let metas = [
            variables_config_map(&ws).metadata,
            role(&ws).metadata,
            role_binding(&ws).metadata,
            cache_claim(&ws).metadata,
            workspace_pod(&ws, "kubetf:test").metadata,
        ];

        for meta in metas {
            let owner = meta.controller_owner().expect("controller reference");
            assert_eq!(owner.kind, "Workspace");
            assert_eq!(owner.name, "network");
            assert_eq!(owner.uid.as_deref(), Some("ws-uid"));
            assert_eq!(meta.namespace, "dev");
            assert_eq!(meta.labels.get(WORKSPACE_LABEL).map(String::as_str), Some("network"));
        }
    }

    #[test]
    fn test_cache_claim_follows_spec() {
        let mut ws = workspace();
        ws.spec.cache.size = "5Gi".to_string();
        ws.spec.cache.storage_class = Some("fast".to_string());

        let claim = cache_claim(&ws);
        assert_eq!(claim.metadata.name, "workspace-network-cache");
        assert_eq!(claim.spec.storage, "5Gi");
        assert_eq!(claim.spec.storage_class_name.as_deref(), Some("fast"));
    }

    #[test]
    fn test_pod_mounts_cache_and_sources_secret() {
        let mut ws = workspace();
        ws.spec.secret_name = "credentials".to_string();
        ws.spec.service_account_name = "terraform".to_string();

        let pod = workspace_pod(&ws, "kubetf:test");
        assert_eq!(pod.metadata.name, "workspace-network");
        assert_eq!(pod.spec.service_account_name, "terraform");

        let container = &pod.spec.containers[0];
        assert_eq!(container.image, "kubetf:test");
        assert_eq!(container.env_from[0].secret_name, "credentials");
        assert!(pod
            .spec
            .volumes
            .iter()
            .any(|v| v.claim_name.as_deref() == Some("workspace-network-cache")));
    }

    #[test]
    fn test_pod_without_secret_has_no_env_from() {
        let pod = workspace_pod(&workspace(), "kubetf:test");
        assert!(pod.spec.containers[0].env_from.is_empty());
    }

    #[test]
    fn test_role_binding_targets_service_account() {
        let binding = role_binding(&workspace());
        assert_eq!(binding.role_ref.name, "workspace-network");
        assert_eq!(binding.subjects[0].name, "default");
        assert_eq!(binding.subjects[0].namespace, "dev");
    }
}
