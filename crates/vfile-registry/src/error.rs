//! Error types for the registry
//!
//! Provides error handling for:
//! - Lookups of absent entries (recoverable)
//! - Identifier collisions (fatal)
//! - Double disposal of a claim (fatal)

use vfile_store::{FileId, StoreError};

/// Registry error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Store-level failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No live record for the identifier; stale entries cannot be claimed
    #[error("virtual file is not tracked: {0}")]
    NotTracked(FileId),

    /// Decrement of a claim the tracker does not know about
    #[error("refcount underflow on {id} (claim #{claim})")]
    RefcountUnderflow {
        /// Identifier whose count would go negative
        id: FileId,
        /// Claim that was released twice or never registered
        claim: u64,
    },
}

impl RegistryError {
    /// Whether the error is a broken tracking invariant
    ///
    /// Fatal errors must never be recovered from silently; doing so would
    /// mask a correctness bug in the tracking discipline.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(e) => e.is_fatal(),
            Self::RefcountUnderflow { .. } => true,
            Self::NotTracked(_) => false,
        }
    }

    /// Whether the error is an ordinary miss
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
            Self::NotTracked(_) => true,
            Self::RefcountUnderflow { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let id = FileId::generate("pdf");
        assert!(RegistryError::Store(StoreError::DuplicateIdentifier(id.clone())).is_fatal());
        assert!(RegistryError::RefcountUnderflow { id: id.clone(), claim: 3 }.is_fatal());
        assert!(RegistryError::NotTracked(id.clone()).is_not_found());
        assert!(RegistryError::from(StoreError::NotFound(id.to_string())).is_not_found());
    }
}
