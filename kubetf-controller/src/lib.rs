//! Workspace reconciliation engine
//!
//! The [`Reconciler`] drives one workspace towards its declared state: it
//! manages the finalizer, prunes stale run approvals and then runs the status
//! pipeline, a fixed sequence of [`StatusStep`]s that each ensure an owned
//! resource exists and record how it is doing as a condition. The pure parts
//! of that work live in their own modules so they can be tested in isolation:
//!
//! - [`queue::compute_queue`] orders mutating runs waiting for the workspace
//! - [`approvals::prune_approvals`] drops approvals of finished runs
//! - [`phase::aggregate_phase`] summarizes conditions into a single phase
//! - [`builders`] renders the resources a workspace owns

pub mod approvals;
pub mod builders;
pub mod conditions;
pub mod error;
pub mod mapping;
pub mod outcome;
pub mod phase;
pub mod queue;
pub mod reconciler;
pub mod steps;

pub use error::{ReconcileError, Result};
pub use outcome::Outcome;
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use steps::StatusStep;

/// Image used for workspace pods unless configured otherwise
pub const DEFAULT_IMAGE: &str = "ghcr.io/kubetf/kubetf:latest";
