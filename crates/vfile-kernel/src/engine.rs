//! A minimal reactive cell engine
//!
//! Runs cells in order, renders each cell's output, drops outputs that are
//! not bound to a name, and reports completions and deletions to the
//! [`LifecycleCoordinator`].

use crate::context::ExecutionContext;
use crate::coordinator::LifecycleCoordinator;
use crate::error::KernelError;
use crate::function::Callable;
use crate::namespace::Namespace;
use crate::state_machine::validate_transition;
use crate::types::{CellId, CellState, KernelConfig};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use vfile_registry::{SweepReport, VirtualFileRegistry};

type CellBody = dyn Fn(&mut CellScope<'_>) -> Result<Option<Value>, KernelError> + Send + Sync;

/// A cell: an id and a body
///
/// The body binds names through its [`CellScope`] and may return an
/// output value, which is rendered and then dropped.
#[derive(Clone)]
pub struct Cell {
    id: CellId,
    body: Arc<CellBody>,
}

impl Cell {
    pub fn new<F>(id: impl Into<CellId>, body: F) -> Self
    where
        F: Fn(&mut CellScope<'_>) -> Result<Option<Value>, KernelError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            body: Arc::new(body),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &CellId {
        &self.id
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell").field("id", &self.id).finish_non_exhaustive()
    }
}

/// What a running cell sees
pub struct CellScope<'a> {
    ctx: &'a ExecutionContext,
    namespace: &'a Namespace,
    cell: &'a CellId,
    bindings: Vec<(String, Value)>,
}

impl<'a> CellScope<'a> {
    fn new(ctx: &'a ExecutionContext, namespace: &'a Namespace, cell: &'a CellId) -> Self {
        Self {
            ctx,
            namespace,
            cell,
            bindings: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn ctx(&self) -> &ExecutionContext {
        self.ctx
    }

    #[inline]
    #[must_use]
    pub fn cell_id(&self) -> &CellId {
        self.cell
    }

    /// Look a name up, preferring this run's own bindings
    ///
    /// # Errors
    /// `UnknownName` if nothing binds `name`.
    pub fn get(&self, name: &str) -> Result<Value, KernelError> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.namespace.get(name))
            .cloned()
            .ok_or_else(|| KernelError::UnknownName(name.to_owned()))
    }

    /// Bind a name for the rest of the notebook
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.push((name.into(), value.into()));
    }

    /// Call the function bound to `name`
    ///
    /// # Errors
    /// `UnknownName`, `TypeMismatch`, or whatever the function reports.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, KernelError> {
        let func: Arc<dyn Callable> = Arc::clone(self.get(name)?.as_function()?);
        func.call(self.ctx, args)
    }

    fn into_bindings(self) -> Vec<(String, Value)> {
        self.bindings
    }
}

/// Result of running one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellOutcome {
    pub cell: CellId,
    /// Rendered output, if the cell returned one
    pub output: Option<String>,
    /// Error shown to the user, if the body failed
    pub error: Option<String>,
    pub bound: Vec<String>,
}

impl CellOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A kernel: one registry, one coordinator, an ordered set of cells
#[derive(Debug)]
pub struct Kernel {
    ctx: ExecutionContext,
    coordinator: LifecycleCoordinator,
    cells: IndexMap<CellId, Cell>,
}

impl Kernel {
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        let ctx = ExecutionContext::new(config);
        let coordinator = LifecycleCoordinator::new(Arc::clone(ctx.registry()));
        Self {
            ctx,
            coordinator,
            cells: IndexMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn ctx(&self) -> &ExecutionContext {
        &self.ctx
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<VirtualFileRegistry> {
        self.ctx.registry()
    }

    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    /// Value bound to `name`
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.coordinator.lookup(name)
    }

    /// Ids of the cells currently defined, in run order
    pub fn cell_ids(&self) -> impl Iterator<Item = &CellId> {
        self.cells.keys()
    }

    /// Define (or redefine) cells and run them in order
    ///
    /// A cell that fails with `Err` is not defined afterwards; a previous
    /// definition under the same id is restored.
    ///
    /// # Errors
    /// Fatal registry errors and lifecycle misuse, such as running a cell id
    /// that was deleted. Errors raised by a cell body are reported in its
    /// [`CellOutcome`] instead.
    pub fn run(&mut self, cells: impl IntoIterator<Item = Cell>) -> Result<Vec<CellOutcome>, KernelError> {
        let mut outcomes = Vec::new();
        for cell in cells {
            validate_transition(self.coordinator.cell_state(cell.id()), CellState::Live)?;
            let previous = self.cells.insert(cell.id().clone(), cell.clone());
            match self.execute(&cell) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    match previous {
                        Some(previous) => {
                            self.cells.insert(cell.id().clone(), previous);
                        }
                        None => {
                            self.cells.shift_remove(cell.id());
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(outcomes)
    }

    /// Run an already defined cell again
    ///
    /// # Errors
    /// `UnknownCell` if the cell is not defined.
    pub fn rerun(&mut self, id: &CellId) -> Result<CellOutcome, KernelError> {
        let cell = self
            .cells
            .get(id)
            .cloned()
            .ok_or_else(|| KernelError::UnknownCell(id.clone()))?;
        self.execute(&cell)
    }

    /// Remove a cell and everything it bound
    ///
    /// # Errors
    /// `UnknownCell` if the cell is not defined.
    pub fn delete_cell(&mut self, id: &CellId) -> Result<SweepReport, KernelError> {
        if !self.cells.contains_key(id) {
            return Err(KernelError::UnknownCell(id.clone()));
        }
        validate_transition(self.coordinator.cell_state(id), CellState::Deleted)?;
        let cell = self
            .cells
            .shift_remove(id)
            .ok_or_else(|| KernelError::UnknownCell(id.clone()))?;
        drop(cell);
        self.coordinator.notify_cell_deleted(id)
    }

    /// See [`LifecycleCoordinator::set_feature_enabled`]
    pub fn set_virtual_files_enabled(&mut self, enabled: bool) -> Option<SweepReport> {
        self.coordinator.set_feature_enabled(enabled)
    }

    /// Explicit collection pass
    pub fn collect(&self) -> SweepReport {
        self.coordinator.collect()
    }

    fn execute(&mut self, cell: &Cell) -> Result<CellOutcome, KernelError> {
        let mut scope = CellScope::new(&self.ctx, self.coordinator.namespace(), cell.id());
        let result = (cell.body)(&mut scope);
        let bindings = scope.into_bindings();

        match result {
            Ok(output) => {
                let rendered = output.as_ref().map(Value::render);
                // outputs are shown, not retained
                drop(output);
                let bound: Vec<String> = bindings.iter().map(|(n, _)| n.clone()).collect();
                match self.coordinator.notify_cell_completed(cell.id(), bindings) {
                    Ok(()) => Ok(CellOutcome {
                        cell: cell.id().clone(),
                        output: rendered,
                        error: None,
                        bound,
                    }),
                    Err(err @ KernelError::MultipleDefinitions { .. }) => {
                        tracing::warn!(cell = %cell.id(), error = %err, "cell rejected");
                        Ok(Self::failed(cell.id(), &err))
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) if !err.is_recoverable() => Err(err),
            Err(err) => {
                drop(bindings);
                tracing::warn!(cell = %cell.id(), error = %err, "cell raised");
                self.coordinator.notify_cell_completed(cell.id(), Vec::new())?;
                Ok(Self::failed(cell.id(), &err))
            }
        }
    }

    fn failed(cell: &CellId, err: &KernelError) -> CellOutcome {
        CellOutcome {
            cell: cell.clone(),
            output: None,
            error: Some(err.to_string()),
            bound: Vec::new(),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}
