use kubetf_types::{CommandClass, Run};
use std::collections::{HashMap, HashSet};

/// Compute a workspace's run queue
///
/// Entries of `existing` whose run is gone or completed are dropped, keeping
/// the order of the rest. Mutating runs for `workspace` that are neither
/// completed nor already queued are then appended in the order `runs` lists
/// them. Plan runs never need exclusive access and are never queued.
pub fn compute_queue(existing: &[String], workspace: &str, runs: &[Run]) -> Vec<String> {
    let by_name: HashMap<&str, &Run> = runs.iter().map(|run| (run.name(), run)).collect();

    let mut seen = HashSet::new();
    let mut queue: Vec<String> = existing
        .iter()
        .filter(|name| {
            by_name
                .get(name.as_str())
                .is_some_and(|run| !run.is_completed())
        })
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();

    for run in runs {
        if !run.belongs_to(workspace)
            || run.command_class() == CommandClass::Plan
            || run.is_completed()
        {
            continue;
        }
        if queue.iter().any(|name| name == run.name()) {
            continue;
        }
        queue.push(run.name().to_string());
    }

    queue
}
