//! Error types for the kernel integration
//!
//! ```text
//!   KernelError
//!   ├── Registry(RegistryError)        ← store/tracker failures
//!   ├── StateMachine(StateMachineError)← illegal cell lifecycle transition
//!   ├── UnknownCell / UnknownName      ← lookups in the live namespace
//!   ├── MultipleDefinitions            ← two cells binding one name
//!   ├── Unhashable / TypeMismatch      ← memoization and value misuse
//!   └── Config                         ← configuration could not be loaded
//! ```

use crate::types::{CellId, CellState};
use vfile_registry::RegistryError;
use vfile_store::StoreError;

/// Cell lifecycle state machine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal cell transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: CellState,
        /// Requested state
        to: CellState,
    },
}

/// Main kernel error type
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Registry failure
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Cell lifecycle misuse
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Cell id not known to the kernel
    #[error("unknown cell: {0}")]
    UnknownCell(CellId),

    /// Name not bound in the live namespace
    #[error("name not defined: {0}")]
    UnknownName(String),

    /// Name already bound by another cell
    #[error("{name} is defined by both {existing} and {offending}")]
    MultipleDefinitions {
        /// Contested name
        name: String,
        /// Cell currently owning the name
        existing: CellId,
        /// Cell attempting to bind it
        offending: CellId,
    },

    /// Argument to a memoized function cannot be used as a cache key
    #[error("unhashable argument of type {0}")]
    Unhashable(&'static str),

    /// Value of the wrong kind
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected kind
        expected: &'static str,
        /// Actual kind
        found: &'static str,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl KernelError {
    /// Whether the error is a broken registry invariant
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Registry(e) if e.is_fatal())
    }

    /// Whether the kernel can continue after reporting the error to the user
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal() && !matches!(self, Self::Config(_))
    }
}

impl From<StoreError> for KernelError {
    fn from(value: StoreError) -> Self {
        Self::Registry(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfile_store::FileId;

    #[test]
    fn fatal_classification() {
        let dup = KernelError::from(StoreError::DuplicateIdentifier(FileId::generate("pdf")));
        assert!(dup.is_fatal());
        assert!(!dup.is_recoverable());

        let missing = KernelError::UnknownName("x".into());
        assert!(missing.is_recoverable());
        assert!(!KernelError::Config("bad".into()).is_recoverable());
    }
}
