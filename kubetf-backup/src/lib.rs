//! Terraform state decoding and remote backup storage
//!
//! [`State`] decodes the compressed state file kept in a workspace's state
//! secret. [`BlobStore`] is the seam to the remote storage holding backups of
//! that secret, with filesystem, in-memory and Google Cloud Storage
//! implementations.

pub mod blob;
pub mod fs;
pub mod gcs;
pub mod memory;
pub mod state;

pub use blob::{BlobError, BlobStore};
pub use fs::FsBlobStore;
pub use gcs::GcsBlobStore;
pub use memory::MemoryBlobStore;
pub use state::{State, StateError, StateOutput};
