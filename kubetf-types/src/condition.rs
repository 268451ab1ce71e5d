use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition types set by the workspace controller. Conditions describe
/// failures: `True` means the sub-resource is failing.
pub const CACHE_FAILURE: &str = "CacheFailure";
pub const POD_FAILURE: &str = "PodFailure";
pub const BACKUP_FAILURE: &str = "BackupFailure";
pub const RESTORE_FAILURE: &str = "RestoreFailure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(
        r#type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }
}

/// Set a condition, replacing any existing condition of the same type in
/// place. The transition time only moves when the status value changes.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            condition.last_transition_time = if existing.status == condition.status {
                existing.last_transition_time.or_else(|| Some(Utc::now()))
            } else {
                Some(Utc::now())
            };
            *existing = condition;
        }
        None => {
            condition.last_transition_time = Some(Utc::now());
            conditions.push(condition);
        }
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_replaces_in_place() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::new(CACHE_FAILURE, ConditionStatus::False, "Pending", ""),
        );
        set_condition(
            &mut conditions,
            Condition::new(POD_FAILURE, ConditionStatus::False, "Pending", ""),
        );
        set_condition(
            &mut conditions,
            Condition::new(CACHE_FAILURE, ConditionStatus::False, "CacheBound", "bound"),
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, CACHE_FAILURE);
        assert_eq!(conditions[0].reason, "CacheBound");
        assert_eq!(conditions[1].r#type, POD_FAILURE);
    }

    #[test]
    fn test_transition_time_kept_when_status_unchanged() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::new(POD_FAILURE, ConditionStatus::False, "Pending", ""),
        );
        let first = conditions[0].last_transition_time;
        set_condition(
            &mut conditions,
            Condition::new(POD_FAILURE, ConditionStatus::False, "Running", ""),
        );

        assert!(first.is_some());
        assert_eq!(conditions[0].last_transition_time, first);
    }
}
