//! Virtual file content store
//!
//! Storage side of the kernel's binary side channel: payloads that cannot be
//! inlined into rendered output are stored here under a generated
//! identifier and read back by the transport layer.
//!
//! # Core Concepts
//!
//! - [`ContentStore`]: identifier → bytes + media type. No policy.
//! - [`AccessGateway`]: read-only facade handed to the transport layer
//! - [`FileId`]: `{ulid}.{ext}` identifiers, never reused
//! - [`Checksum`]: Blake3 digest recorded with every entry
//!
//! Lifetime policy (who decides when an entry dies) lives in the
//! `vfile-registry` crate.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod checksum;
mod entry;
mod error;
mod gateway;
mod id;
mod media;
mod store;
pub mod url;

pub use checksum::{Checksum, ChecksumError};
pub use entry::ContentEntry;
pub use error::StoreError;
pub use gateway::{AccessGateway, FetchedContent};
pub use id::FileId;
pub use media::MediaType;
pub use store::{ContentStore, Registration};
pub use url::DEFAULT_URL_PREFIX;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
