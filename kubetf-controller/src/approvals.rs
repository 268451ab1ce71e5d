use kubetf_types::{Run, APPROVAL_ANNOTATION_PREFIX};
use std::collections::BTreeMap;

/// Drop approval annotations of runs that are gone or completed
///
/// Returns `None` when `annotations` holds no approvals at all, otherwise
/// the full annotation set with only live approvals kept. The caller decides
/// whether the result differs enough to warrant an update.
pub fn prune_approvals(
    annotations: &BTreeMap<String, String>,
    runs: &[Run],
) -> Option<BTreeMap<String, String>> {
    if !has_approvals(annotations) {
        return None;
    }

    let mut pruned: BTreeMap<String, String> = annotations
        .iter()
        .filter(|(key, _)| !key.starts_with(APPROVAL_ANNOTATION_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for run in runs.iter().filter(|run| !run.is_completed()) {
        let key = run.approval_annotation_key();
        if let Some(value) = annotations.get(&key) {
            pruned.insert(key, value.clone());
        }
    }

    Some(pruned)
}

pub fn has_approvals(annotations: &BTreeMap<String, String>) -> bool {
    annotations
        .keys()
        .any(|key| key.starts_with(APPROVAL_ANNOTATION_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubetf_types::RunPhase;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_approvals_means_no_change() {
        let current = annotations(&[("owner", "platform")]);
        assert_eq!(prune_approvals(&current, &[]), None);
    }

    #[test]
    fn test_keeps_approvals_of_live_runs_only() {
        let current = annotations(&[
            ("owner", "platform"),
            ("approvals.kubetf.dev/apply-1", "approved"),
            ("approvals.kubetf.dev/apply-2", "approved"),
            ("approvals.kubetf.dev/apply-3", "approved"),
        ]);
        let mut done = Run::new("default", "apply-2", "apply", "network");
        done.phase = RunPhase::Completed;
        let runs = vec![Run::new("default", "apply-1", "apply", "network"), done];

        let pruned = prune_approvals(&current, &runs).expect("approvals present");
        assert_eq!(
            pruned,
            annotations(&[
                ("owner", "platform"),
                ("approvals.kubetf.dev/apply-1", "approved"),
            ])
        );
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let current = annotations(&[
            ("approvals.kubetf.dev/apply-1", "approved"),
            ("approvals.kubetf.dev/apply-9", "approved"),
        ]);
        let runs = vec![Run::new("default", "apply-1", "apply", "network")];

        let once = prune_approvals(&current, &runs).expect("approvals present");
        let twice = prune_approvals(&once, &runs).expect("approvals present");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unapproved_runs_gain_nothing() {
        let current = annotations(&[("approvals.kubetf.dev/gone", "approved")]);
        let runs = vec![Run::new("default", "apply-1", "apply", "network")];

        let pruned = prune_approvals(&current, &runs).expect("approvals present");
        assert!(pruned.is_empty());
    }
}
