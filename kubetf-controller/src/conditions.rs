//! Reasons recorded on workspace conditions
//!
//! Conditions are failure conditions: `False` means the resource is fine and
//! the reason says in what way, `True` means it is failing.

use kubetf_types::condition::{BACKUP_FAILURE, CACHE_FAILURE, POD_FAILURE, RESTORE_FAILURE};
use kubetf_types::{ConditionStatus, WorkspaceStatus};

/// Resource is being created or waiting to be scheduled
pub const PENDING_REASON: &str = "Pending";

pub const CACHE_BOUND_REASON: &str = "CacheBound";
pub const CACHE_LOST_REASON: &str = "CacheLost";

pub const BACKUP_SUCCESSFUL_REASON: &str = "BackupSuccessful";
pub const RESTORE_SUCCESSFUL_REASON: &str = "RestoreSuccessful";
pub const NOTHING_TO_RESTORE_REASON: &str = "NothingToRestore";

pub const BUCKET_NOT_FOUND_REASON: &str = "BucketNotFound";
pub const CLIENT_UNAVAILABLE_REASON: &str = "ClientUnavailable";
pub const UNEXPECTED_ERROR_REASON: &str = "UnexpectedError";

pub fn cache_ok(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(CACHE_FAILURE, ConditionStatus::False, reason, message);
}

pub fn cache_failed(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(CACHE_FAILURE, ConditionStatus::True, reason, message);
}

pub fn pod_ok(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(POD_FAILURE, ConditionStatus::False, reason, message);
}

pub fn pod_failed(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(POD_FAILURE, ConditionStatus::True, reason, message);
}

pub fn pod_unknown(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(POD_FAILURE, ConditionStatus::Unknown, reason, message);
}

pub fn backup_ok(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(BACKUP_FAILURE, ConditionStatus::False, reason, message);
}

pub fn backup_failed(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(BACKUP_FAILURE, ConditionStatus::True, reason, message);
}

pub fn restore_ok(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(RESTORE_FAILURE, ConditionStatus::False, reason, message);
}

pub fn restore_failed(status: &mut WorkspaceStatus, reason: &str, message: &str) {
    status.set_condition(RESTORE_FAILURE, ConditionStatus::True, reason, message);
}
