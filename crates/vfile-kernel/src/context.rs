//! Execution context handed to every cell

use crate::types::KernelConfig;
use std::sync::Arc;
use vfile_registry::VirtualFileRegistry;

/// Per-kernel services visible to running cells
///
/// Owns the kernel's single [`VirtualFileRegistry`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    registry: Arc<VirtualFileRegistry>,
    config: Arc<KernelConfig>,
}

impl ExecutionContext {
    /// Build a context and its registry from configuration
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        let registry = Arc::new(VirtualFileRegistry::new(config.registry.clone()));
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    /// The kernel's virtual file registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<VirtualFileRegistry> {
        &self.registry
    }

    /// Kernel configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Whether payloads are stored rather than inlined
    #[inline]
    #[must_use]
    pub fn virtual_files_supported(&self) -> bool {
        self.registry.is_enabled()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}
