//! Core types for the kernel integration
//!
//! Defines:
//! - Cell identifiers and lifecycle states
//! - Kernel configuration

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use vfile_registry::RegistryConfig;

/// Cell identifier, as assigned by the notebook front end
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Create a cell id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CellId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a cell as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Never completed a run
    Unregistered,
    /// Completed at least one run; its bindings are in the live namespace
    Live,
    /// Removed from the notebook; terminal
    Deleted,
}

impl CellState {
    /// All states, for exhaustive tests
    pub const ALL: [CellState; 3] = [CellState::Unregistered, CellState::Live, CellState::Deleted];
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Registry settings
    pub registry: RegistryConfig,
    /// Default capacity of memoized functions
    pub memo_capacity: usize,
}

impl KernelConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With registry settings
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// With memo capacity
    #[inline]
    #[must_use]
    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// `Config` if the document is not valid TOML for this structure.
    pub fn from_toml(source: &str) -> Result<Self, KernelError> {
        toml::from_str(source).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&source)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            memo_capacity: 128,
        }
    }
}
