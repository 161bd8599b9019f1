//! Notebook simulator
//!
//! Drives a [`Kernel`] through a seeded random workload of cell runs,
//! reruns, deletions, memoized calls, embeddings and feature toggles, and
//! checks the registry invariants after every step:
//! - no stored entry sits at a zero count
//! - every handle reachable from the namespace resolves through the gateway
//! - every stored payload still matches its checksum
//!
//! After the workload every remaining cell is deleted; anything left in the
//! registry is reported as a leak.

use crate::data;
use crate::engine::{Cell, CellScope, Kernel};
use crate::error::KernelError;
use crate::function::Function;
use crate::memo::Memoized;
use crate::render::RenderedOutput;
use crate::types::{CellId, KernelConfig};
use crate::value::{SharedList, Value};
use indexmap::IndexMap;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vfile_registry::{DedupPolicy, RegistryConfig};
use vfile_store::FileId;

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub total_operations: u64,
    /// Upper bound on simultaneously defined cells
    pub max_cells: usize,
    pub files_per_cell: usize,
    pub memo_capacity: usize,
    pub dedup: DedupPolicy,
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1_000,
            max_cells: 16,
            files_per_cell: 3,
            memo_capacity: 4,
            dedup: DedupPolicy::Independent,
            stop_on_first_violation: true,
        }
    }
}

/// Operation applied to the kernel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SimulatedOperation {
    /// Run a cell binding fresh files
    Produce { cell: usize, files: usize },
    /// Run a cell defining a memoized file producer
    DefineMemo { cell: usize },
    /// Run a cell binding the result of a memoized call
    CallMemo { cell: usize, memo: usize, arg: i64 },
    /// Run a cell binding a markdown composite embedding another cell's file
    Embed { cell: usize, source: usize },
    /// Run a cell binding a list holding another cell's file and a fresh one
    Collect { cell: usize, source: usize },
    Rerun { cell: usize },
    Delete { cell: usize },
    /// Flip virtual file support off and back on
    ToggleFeature,
    /// Explicit collection pass
    Sweep,
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// A stored entry has no live claim
    ZeroCountEntry { operation: SimulatedOperation, id: FileId },
    /// A reachable handle no longer resolves
    DanglingHandle { operation: SimulatedOperation, id: FileId },
    /// Stored bytes no longer match their checksum
    CorruptPayload { operation: SimulatedOperation, id: FileId },
    /// Entries left after every cell was deleted
    Leak { remaining: usize },
    /// The kernel returned an error instead of a cell outcome
    UnexpectedError { operation: SimulatedOperation, error: String },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    pub operations: u64,
    pub cells_run: u64,
    pub cells_deleted: u64,
    pub cell_errors: u64,
    pub toggles: u64,
    pub sweep_evictions: u64,
    pub peak_entries: usize,
}

/// Final report from simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Virtual File Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Dedup: {:?}", self.config.dedup);
        let _ = writeln!(report, "Operations: {}", self.stats.operations);
        let _ = writeln!(report, "Cells Run: {}", self.stats.cells_run);
        let _ = writeln!(report, "Cells Deleted: {}", self.stats.cells_deleted);
        let _ = writeln!(report, "Cell Errors: {}", self.stats.cell_errors);
        let _ = writeln!(report, "Feature Toggles: {}", self.stats.toggles);
        let _ = writeln!(report, "Sweep Evictions: {}", self.stats.sweep_evictions);
        let _ = writeln!(report, "Peak Entries: {}", self.stats.peak_entries);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(report, "\n=== Result: {} ===", if self.passed() { "PASS" } else { "FAIL" });
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Producer,
    Memo,
    Caller,
    Embedder,
    Collector,
}

struct Simulation {
    config: SimulatorConfig,
    rng: StdRng,
    kernel: Kernel,
    cells: IndexMap<usize, CellKind>,
    next_cell: usize,
    payload_counter: Arc<AtomicU64>,
    stats: SimulatorStats,
    violations: Vec<Violation>,
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let kernel_config = KernelConfig::new()
        .with_memo_capacity(config.memo_capacity)
        .with_registry(RegistryConfig::new().with_dedup(config.dedup));

    let mut sim = Simulation {
        rng: StdRng::seed_from_u64(config.seed),
        kernel: Kernel::new(kernel_config),
        cells: IndexMap::new(),
        next_cell: 0,
        payload_counter: Arc::new(AtomicU64::new(0)),
        stats: SimulatorStats::default(),
        violations: Vec::new(),
        config,
    };

    for _ in 0..sim.config.total_operations {
        let operation = sim.generate_operation();
        sim.stats.operations += 1;
        if let Err(e) = sim.apply(&operation) {
            sim.violations.push(Violation::UnexpectedError {
                operation: operation.clone(),
                error: e.to_string(),
            });
        }
        sim.check_invariants(&operation);
        if sim.config.stop_on_first_violation && !sim.violations.is_empty() {
            break;
        }
    }

    sim.teardown();

    tracing::info!(
        seed = sim.config.seed,
        operations = sim.stats.operations,
        violations = sim.violations.len(),
        "simulation finished"
    );

    SimulatorReport {
        config: sim.config,
        stats: sim.stats,
        violations: sim.violations,
    }
}

impl Simulation {
    fn generate_operation(&mut self) -> SimulatedOperation {
        let producers = self.cells_of(CellKind::Producer);
        let memos = self.cells_of(CellKind::Memo);
        let full = self.cells.len() >= self.config.max_cells;

        let roll = self.rng.random_range(0..100);
        match roll {
            0..=14 if !full => SimulatedOperation::Produce {
                cell: self.fresh_cell(),
                files: self.rng.random_range(1..=self.config.files_per_cell.max(1)),
            },
            15..=24 if !full => SimulatedOperation::DefineMemo { cell: self.fresh_cell() },
            25..=39 if !full && !memos.is_empty() => SimulatedOperation::CallMemo {
                cell: self.fresh_cell(),
                memo: memos[self.rng.random_range(0..memos.len())],
                arg: self.rng.random_range(0..4),
            },
            40..=49 if !full && !producers.is_empty() => SimulatedOperation::Embed {
                cell: self.fresh_cell(),
                source: producers[self.rng.random_range(0..producers.len())],
            },
            50..=57 if !full && !producers.is_empty() => SimulatedOperation::Collect {
                cell: self.fresh_cell(),
                source: producers[self.rng.random_range(0..producers.len())],
            },
            58..=77 if !self.cells.is_empty() => SimulatedOperation::Rerun { cell: self.pick_cell() },
            78..=93 if !self.cells.is_empty() => SimulatedOperation::Delete { cell: self.pick_cell() },
            94..=96 => SimulatedOperation::ToggleFeature,
            97..=99 => SimulatedOperation::Sweep,
            _ if !self.cells.is_empty() => SimulatedOperation::Rerun { cell: self.pick_cell() },
            _ if !full => SimulatedOperation::Produce {
                cell: self.fresh_cell(),
                files: 1,
            },
            _ => SimulatedOperation::Sweep,
        }
    }

    fn apply(&mut self, operation: &SimulatedOperation) -> Result<(), KernelError> {
        match *operation {
            SimulatedOperation::Produce { cell, files } => {
                let counter = Arc::clone(&self.payload_counter);
                self.run_cell(cell, CellKind::Producer, move |scope| {
                    for i in 0..files {
                        let n = counter.fetch_add(1, Ordering::Relaxed);
                        let file = data::pdf(scope.ctx(), format!("payload {n}").into_bytes())?;
                        scope.bind(format!("f{cell}_{i}"), file);
                    }
                    Ok(None)
                })
            }
            SimulatedOperation::DefineMemo { cell } => {
                let capacity = self.kernel.ctx().config().memo_capacity;
                self.run_cell(cell, CellKind::Memo, move |scope| {
                    let producer = Function::new(format!("make{cell}"), |ctx, args| {
                        let arg = args.first().map_or(Ok(0), Value::as_int)?;
                        Ok(data::pdf(ctx, format!("memo result {arg}").into_bytes())?.into())
                    });
                    scope.bind(format!("memo{cell}"), Arc::new(Memoized::new(producer, capacity)));
                    Ok(None)
                })
            }
            SimulatedOperation::CallMemo { cell, memo, arg } => self.run_cell(cell, CellKind::Caller, move |scope| {
                let result = scope.call(&format!("memo{memo}"), &[Value::Int(arg)])?;
                scope.bind(format!("r{cell}"), result);
                Ok(None)
            }),
            SimulatedOperation::Embed { cell, source } => self.run_cell(cell, CellKind::Embedder, move |scope| {
                let file = scope.get(&format!("f{source}_0"))?;
                let md = RenderedOutput::markdown("![doc](").embed(file.as_file()?)?.push_str(")");
                scope.bind(format!("md{cell}"), md);
                Ok(None)
            }),
            SimulatedOperation::Collect { cell, source } => {
                let counter = Arc::clone(&self.payload_counter);
                self.run_cell(cell, CellKind::Collector, move |scope| {
                    let list = SharedList::new();
                    list.push(scope.get(&format!("f{source}_0"))?);
                    let n = counter.fetch_add(1, Ordering::Relaxed);
                    list.push(data::csv(scope.ctx(), format!("n\n{n}\n"))?);
                    scope.bind(format!("bag{cell}"), list);
                    Ok(None)
                })
            }
            SimulatedOperation::Rerun { cell } => {
                let outcome = self.kernel.rerun(&cell_id(cell))?;
                self.record_outcome(outcome.is_ok());
                Ok(())
            }
            SimulatedOperation::Delete { cell } => {
                let report = self.kernel.delete_cell(&cell_id(cell))?;
                self.cells.shift_remove(&cell);
                self.stats.cells_deleted += 1;
                self.stats.sweep_evictions += report.evicted.len() as u64;
                Ok(())
            }
            SimulatedOperation::ToggleFeature => {
                self.stats.toggles += 1;
                self.kernel.set_virtual_files_enabled(false);
                if let Some(report) = self.kernel.set_virtual_files_enabled(true) {
                    self.stats.sweep_evictions += report.evicted.len() as u64;
                }
                Ok(())
            }
            SimulatedOperation::Sweep => {
                let report = self.kernel.collect();
                self.stats.sweep_evictions += report.evicted.len() as u64;
                Ok(())
            }
        }
    }

    fn run_cell<F>(&mut self, cell: usize, kind: CellKind, body: F) -> Result<(), KernelError>
    where
        F: Fn(&mut CellScope<'_>) -> Result<Option<Value>, KernelError> + Send + Sync + 'static,
    {
        self.cells.insert(cell, kind);
        let outcomes = self.kernel.run([Cell::new(cell_id(cell), body)])?;
        for outcome in outcomes {
            self.record_outcome(outcome.is_ok());
        }
        Ok(())
    }

    fn record_outcome(&mut self, ok: bool) {
        self.stats.cells_run += 1;
        if !ok {
            self.stats.cell_errors += 1;
        }
    }

    fn check_invariants(&mut self, operation: &SimulatedOperation) {
        let registry = Arc::clone(self.kernel.registry());
        self.stats.peak_entries = self.stats.peak_entries.max(registry.len());

        for id in registry.identifiers() {
            if registry.refcount(&id) == 0 {
                self.violations.push(Violation::ZeroCountEntry {
                    operation: operation.clone(),
                    id: id.clone(),
                });
            }
            match registry.store().read(&id) {
                Ok(entry) if !entry.verify() => self.violations.push(Violation::CorruptPayload {
                    operation: operation.clone(),
                    id,
                }),
                _ => {}
            }
        }

        let reachable: Vec<_> = self
            .kernel
            .coordinator()
            .namespace()
            .values()
            .flat_map(Value::files)
            .collect();
        for file in reachable {
            let Some(id) = file.id() else { continue };
            if registry.gateway().fetch(id).is_err() {
                self.violations.push(Violation::DanglingHandle {
                    operation: operation.clone(),
                    id: id.clone(),
                });
            }
        }
    }

    fn teardown(&mut self) {
        let cells: Vec<usize> = self.cells.keys().copied().collect();
        for cell in cells {
            let operation = SimulatedOperation::Delete { cell };
            if let Err(e) = self.apply(&operation) {
                self.violations.push(Violation::UnexpectedError {
                    operation,
                    error: e.to_string(),
                });
            }
        }
        let report = self.kernel.collect();
        self.stats.sweep_evictions += report.evicted.len() as u64;
        if report.remaining > 0 {
            self.violations.push(Violation::Leak {
                remaining: report.remaining,
            });
        }
    }

    fn cells_of(&self, kind: CellKind) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(c, _)| *c)
            .collect()
    }

    fn fresh_cell(&mut self) -> usize {
        self.next_cell += 1;
        self.next_cell
    }

    fn pick_cell(&mut self) -> usize {
        let index = self.rng.random_range(0..self.cells.len());
        self.cells.get_index(index).map_or(0, |(c, _)| *c)
    }
}

fn cell_id(cell: usize) -> CellId {
    CellId::new(format!("c{cell}"))
}

#[cfg(all(test, not(feature = "strict-debug")))]
mod tests {
    use super::*;

    #[test]
    fn short_run_passes() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 200,
            ..Default::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.operations, 200);
    }

    #[test]
    fn same_seed_same_stats() {
        let config = SimulatorConfig {
            seed: 7,
            total_operations: 150,
            ..Default::default()
        };
        let a = run_simulator(config.clone());
        let b = run_simulator(config);
        assert_eq!(a.stats.cells_run, b.stats.cells_run);
        assert_eq!(a.stats.peak_entries, b.stats.peak_entries);
    }
}
