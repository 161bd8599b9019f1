//! Virtual file kernel integration (vfile-kernel)
//!
//! Wires the virtual file registry into a reactive cell kernel:
//! 1. **Values**: file handles, rendered composites, shared lists and
//!    memoized producers, all owning claims by scope
//! 2. **Lifecycle**: the coordinator replaces a cell's bindings on rerun and
//!    drops them on deletion, then runs a collection pass
//!
//! # Quick Start
//!
//! ```rust
//! use vfile_kernel::prelude::*;
//!
//! let mut kernel = Kernel::default();
//! kernel
//!     .run([Cell::new("a", |scope| {
//!         let report = data::pdf(scope.ctx(), b"%PDF-1.7".to_vec())?;
//!         scope.bind("report", report);
//!         Ok(None)
//!     })])
//!     .unwrap();
//! assert_eq!(kernel.registry().len(), 1);
//!
//! kernel.delete_cell(&CellId::new("a")).unwrap();
//! assert!(kernel.registry().is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod context;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod function;
pub mod memo;
pub mod namespace;
pub mod render;
pub mod state_machine;
pub mod types;
pub mod value;

// Cell engine
pub mod engine;

// Test harness
pub mod test_harness;

// Re-exports
pub use error::*;
pub use types::*;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::context::ExecutionContext;
    pub use crate::coordinator::LifecycleCoordinator;
    pub use crate::data;
    pub use crate::engine::{Cell, CellOutcome, CellScope, Kernel};
    pub use crate::error::{KernelError, StateMachineError};
    pub use crate::function::{Callable, Function};
    pub use crate::memo::{CacheInfo, Memoized};
    pub use crate::namespace::Namespace;
    pub use crate::render::{OutputFormat, RenderedOutput};
    pub use crate::types::{CellId, CellState, KernelConfig};
    pub use crate::value::{SharedList, Value};
    pub use vfile_registry::{DedupPolicy, RegistryConfig, SweepReport, VirtualFile, VirtualFileRegistry};
    pub use vfile_store::{FileId, MediaType};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
