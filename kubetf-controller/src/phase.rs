use crate::conditions::PENDING_REASON;
use kubetf_types::{Condition, ConditionStatus, WorkspacePhase};

/// Summarize failure conditions into a workspace phase
///
/// Scans in order: the first failing condition yields `Error` at once. An
/// unknown condition makes the phase `Unknown`, and a pending one makes it
/// `Initializing` unless it is already `Unknown`. With none of those the
/// workspace is `Ready`.
pub fn aggregate_phase(conditions: &[Condition]) -> WorkspacePhase {
    let mut phase = WorkspacePhase::Ready;

    for condition in conditions {
        match condition.status {
            ConditionStatus::True => return WorkspacePhase::Error,
            ConditionStatus::Unknown => phase = WorkspacePhase::Unknown,
            ConditionStatus::False => {
                if condition.reason == PENDING_REASON && phase != WorkspacePhase::Unknown {
                    phase = WorkspacePhase::Initializing;
                }
            }
        }
    }

    phase
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(status: ConditionStatus, reason: &str) -> Condition {
        Condition::new("PodFailure", status, reason, "")
    }

    #[test]
    fn test_no_conditions_is_ready() {
        assert_eq!(aggregate_phase(&[]), WorkspacePhase::Ready);
    }

    #[test]
    fn test_healthy_conditions_are_ready() {
        let conditions = vec![
            cond(ConditionStatus::False, "CacheBound"),
            cond(ConditionStatus::False, "Running"),
        ];
        assert_eq!(aggregate_phase(&conditions), WorkspacePhase::Ready);
    }

    #[test]
    fn test_failure_wins() {
        let conditions = vec![
            cond(ConditionStatus::False, "Pending"),
            cond(ConditionStatus::Unknown, "Unknown"),
            cond(ConditionStatus::True, "CacheLost"),
        ];
        assert_eq!(aggregate_phase(&conditions), WorkspacePhase::Error);
    }

    #[test]
    fn test_unknown_beats_pending_in_any_order() {
        let pending_first = vec![
            cond(ConditionStatus::False, "Pending"),
            cond(ConditionStatus::Unknown, "Unknown"),
        ];
        let unknown_first = vec![
            cond(ConditionStatus::Unknown, "Unknown"),
            cond(ConditionStatus::False, "Pending"),
        ];
        assert_eq!(aggregate_phase(&pending_first), WorkspacePhase::Unknown);
        assert_eq!(aggregate_phase(&unknown_first), WorkspacePhase::Unknown);
    }

    #[test]
    fn test_pending_is_initializing() {
        let conditions = vec![
            cond(ConditionStatus::False, "CacheBound"),
            cond(ConditionStatus::False, "Pending"),
        ];
        assert_eq!(aggregate_phase(&conditions), WorkspacePhase::Initializing);
    }
}
