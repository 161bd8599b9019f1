//! Reacts to cell lifecycle events
//!
//! The coordinator owns the live namespace and the per-cell state machine.
//! It never adjusts reference counts itself: every claim is released by
//! dropping the value that holds it, so removing a binding (or a memoized
//! function and its cache) is all a deletion has to do.

use crate::error::KernelError;
use crate::namespace::Namespace;
use crate::state_machine::validate_transition;
use crate::types::{CellId, CellState};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use vfile_registry::{SweepReport, VirtualFileRegistry};

/// Lifecycle coordinator for one kernel
#[derive(Debug)]
pub struct LifecycleCoordinator {
    registry: Arc<VirtualFileRegistry>,
    namespace: Namespace,
    cells: HashMap<CellId, CellState>,
    // set while the gate is off; re-enabling collects
    disabled_since_collect: bool,
}

impl LifecycleCoordinator {
    #[must_use]
    pub fn new(registry: Arc<VirtualFileRegistry>) -> Self {
        let disabled_since_collect = !registry.is_enabled();
        Self {
            registry,
            namespace: Namespace::new(),
            cells: HashMap::new(),
            disabled_since_collect,
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<VirtualFileRegistry> {
        &self.registry
    }

    /// The live namespace
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Value bound to `name`
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.namespace.get(name)
    }

    /// State of a cell; cells never seen are `Unregistered`
    #[must_use]
    pub fn cell_state(&self, cell: &CellId) -> CellState {
        self.cells.get(cell).copied().unwrap_or(CellState::Unregistered)
    }

    /// Cells currently live
    #[must_use]
    pub fn live_cells(&self) -> Vec<CellId> {
        let mut live: Vec<CellId> = self
            .cells
            .iter()
            .filter(|(_, s)| **s == CellState::Live)
            .map(|(c, _)| c.clone())
            .collect();
        live.sort();
        live
    }

    /// A cell finished running and produced `produced`
    ///
    /// The cell's previous bindings are replaced; displaced values are
    /// dropped before this returns.
    ///
    /// # Errors
    /// `IllegalTransition` for a deleted cell, `MultipleDefinitions` if
    /// another cell owns one of the names. The namespace is unchanged on
    /// error and the produced values are dropped.
    pub fn notify_cell_completed(
        &mut self,
        cell: &CellId,
        produced: Vec<(String, Value)>,
    ) -> Result<(), KernelError> {
        let from = self.cell_state(cell);
        validate_transition(from, CellState::Live)?;

        let bound = produced.len();
        let displaced = self.namespace.replace_cell_bindings(cell, produced)?;
        self.cells.insert(cell.clone(), CellState::Live);

        let stale = displaced.len();
        drop(displaced);

        tracing::info!(
            cell = %cell,
            rerun = from == CellState::Live,
            bound,
            stale,
            files = self.registry.len(),
            "cell completed"
        );
        Ok(())
    }

    /// A cell was removed from the notebook
    ///
    /// Drops every binding of the cell, then runs a collection pass.
    ///
    /// # Errors
    /// `IllegalTransition` if the cell was already deleted.
    pub fn notify_cell_deleted(&mut self, cell: &CellId) -> Result<SweepReport, KernelError> {
        validate_transition(self.cell_state(cell), CellState::Deleted)?;

        let removed = self.namespace.remove_cell(cell);
        self.cells.insert(cell.clone(), CellState::Deleted);
        let names = removed.len();
        drop(removed);

        tracing::info!(cell = %cell, names, files = self.registry.len(), "cell deleted");
        Ok(self.collect())
    }

    /// Toggle virtual file support
    ///
    /// Returns the collection report when re-enabling after a disable.
    pub fn set_feature_enabled(&mut self, enabled: bool) -> Option<SweepReport> {
        let previous = self.registry.set_enabled(enabled);
        if !enabled {
            self.disabled_since_collect |= previous;
            return None;
        }
        if std::mem::take(&mut self.disabled_since_collect) {
            Some(self.collect())
        } else {
            None
        }
    }

    /// Explicit collection pass
    pub fn collect(&self) -> SweepReport {
        self.registry.sweep()
    }
}
