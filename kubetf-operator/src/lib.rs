//! The kubetf operator
//!
//! Wires configuration, the object store, the backup store and the workspace
//! [`Reconciler`](kubetf_controller::Reconciler) into a long-running
//! [`Controller`].

pub mod backup;
pub mod config;
pub mod controller;
pub mod watch;
pub mod work_queue;

pub use config::{BackupConfig, BackupProvider, Config};
pub use controller::{Controller, ControllerSettings};
