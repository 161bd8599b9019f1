//! Error types for the content store
//!
//! ```text
//!   StoreError
//!   ├── NotFound             ← read/fetch of an absent or evicted entry
//!   ├── DuplicateIdentifier  ← identifier collision on registration (fatal)
//!   ├── InvalidIdentifier    ← malformed identifier string
//!   └── InvalidUrl           ← reference token does not parse
//! ```

use crate::id::FileId;

/// Content store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Entry absent: never registered, or already evicted
    #[error("virtual file not found: {0}")]
    NotFound(String),

    /// Registration collided with an existing identifier
    #[error("duplicate virtual file identifier: {0}")]
    DuplicateIdentifier(FileId),

    /// Identifier contains characters outside `[A-Za-z0-9._-]`
    #[error("invalid virtual file identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Reference token is not of the form `{prefix}{len}-{identifier}`
    #[error("invalid virtual file url: {0:?}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Whether the error signals a broken invariant rather than a normal
    /// failure result
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateIdentifier(_))
    }

    /// Whether the caller can treat this as an ordinary miss
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
