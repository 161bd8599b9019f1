//! Reference-counted virtual file registry
//!
//! Keeps a stored payload alive exactly as long as something still holds a
//! claim on it.
//!
//! # Core Concepts
//!
//! - [`VirtualFileRegistry`]: the per-kernel service (store + tracker + gateway)
//! - [`ReferenceTracker`]: per-identifier counts, eviction at zero
//! - [`Claim`]: one counted claim; released when dropped
//! - [`VirtualFile`]: the handle cells hold. `clone` borrows, `acquire` counts.
//!
//! # Example
//!
//! ```rust
//! use vfile_registry::VirtualFileRegistry;
//! use vfile_store::MediaType;
//!
//! let registry = VirtualFileRegistry::default();
//! let pdf = registry.create(&b"%PDF-1.4"[..], MediaType::PDF).unwrap();
//! let id = pdf.id().unwrap().clone();
//!
//! // a rendered composite keeps its own claim
//! let embedded = pdf.acquire().unwrap();
//! assert_eq!(registry.refcount(&id), 2);
//!
//! drop(pdf);
//! assert_eq!(registry.refcount(&id), 1);
//! drop(embedded);
//! assert!(registry.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod file;
mod registry;
mod tracker;

pub use config::{DedupPolicy, RegistryConfig};
pub use error::RegistryError;
pub use file::VirtualFile;
pub use registry::{RegistryStats, SweepReport, VirtualFileRegistry};
pub use tracker::{Claim, ClaimId, ReferenceRecord, ReferenceTracker};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
