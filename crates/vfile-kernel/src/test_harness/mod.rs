// Test harness module
// Seeded notebook simulator and stress runs

pub mod simulator;

pub use simulator::*;

use crate::data;
use crate::engine::{Cell, Kernel};
use crate::types::CellId;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use vfile_store::{FileId, StoreError};

/// Test harness for running stress tests and certification
pub struct TestHarness;

impl TestHarness {
    /// Create `files_per_cell` files in each of `cells` cells, delete every
    /// cell, and check the registry drained
    #[must_use]
    pub fn run_stress_test(cells: usize, files_per_cell: usize) -> StressTestReport {
        tracing::info!(cells, files_per_cell, "running stress test");
        let start = Instant::now();
        let mut kernel = Kernel::default();
        let mut failures = 0;

        let ids = spawn_file_cells(&mut kernel, cells, files_per_cell, &mut failures);
        let files = kernel.registry().len();
        for id in ids {
            if kernel.delete_cell(&id).is_err() {
                failures += 1;
            }
        }
        let leaked = kernel.collect().remaining;

        StressTestReport {
            cells,
            files,
            reads: 0,
            misses: 0,
            torn_reads: 0,
            leaked,
            success: failures == 0 && leaked == 0 && files == cells * files_per_cell,
            elapsed_ms: elapsed_ms(start),
        }
    }

    /// Like [`TestHarness::run_stress_test`], with `readers` tasks fetching
    /// every file through the gateway while the cells are deleted
    ///
    /// A read must return either the exact payload or `NotFound`.
    pub async fn run_concurrent_stress(cells: usize, files_per_cell: usize, readers: usize) -> StressTestReport {
        tracing::info!(cells, files_per_cell, readers, "running concurrent stress test");
        let start = Instant::now();
        let mut kernel = Kernel::default();
        let mut failures = 0;

        let cell_ids = spawn_file_cells(&mut kernel, cells, files_per_cell, &mut failures);
        let gateway = kernel.registry().gateway().clone();

        let mut expected: Vec<(FileId, Arc<[u8]>)> = Vec::new();
        for id in kernel.registry().identifiers() {
            match gateway.fetch(&id) {
                Ok(content) => expected.push((id, content.bytes)),
                Err(_) => failures += 1,
            }
        }
        let files = expected.len();
        let expected = Arc::new(expected);
        let done = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(readers);
        for _ in 0..readers {
            let gateway = gateway.clone();
            let expected = Arc::clone(&expected);
            let done = Arc::clone(&done);
            handles.push(tokio::spawn(async move {
                let mut tally = ReadTally::default();
                loop {
                    let last_pass = done.load(Ordering::Acquire);
                    for (id, bytes) in expected.iter() {
                        match gateway.fetch(id) {
                            Ok(content) if content.bytes == *bytes => tally.reads += 1,
                            Ok(_) => tally.torn += 1,
                            Err(StoreError::NotFound(_)) => tally.misses += 1,
                            Err(_) => tally.torn += 1,
                        }
                    }
                    if last_pass {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                tally
            }));
        }

        for id in cell_ids {
            if kernel.delete_cell(&id).is_err() {
                failures += 1;
            }
            tokio::task::yield_now().await;
        }
        done.store(true, Ordering::Release);

        let mut total = ReadTally::default();
        for handle in handles {
            match handle.await {
                Ok(tally) => total.merge(tally),
                Err(e) => {
                    tracing::error!(error = %e, "reader task failed");
                    failures += 1;
                }
            }
        }
        let leaked = kernel.collect().remaining;

        StressTestReport {
            cells,
            files,
            reads: total.reads,
            misses: total.misses,
            torn_reads: total.torn,
            leaked,
            success: failures == 0 && leaked == 0 && total.torn == 0,
            elapsed_ms: elapsed_ms(start),
        }
    }

    /// Run the simulator across ten seeds with both dedup policies
    #[must_use]
    pub fn run_certification() -> CertificationReport {
        tracing::info!("running certification simulation");
        let mut total_violations = 0;
        let mut seeds_tested = 0;

        for dedup in [vfile_registry::DedupPolicy::Independent, vfile_registry::DedupPolicy::ContentHash] {
            for seed in 0..10 {
                let report = run_simulator(SimulatorConfig {
                    seed,
                    total_operations: 2_000,
                    dedup,
                    ..Default::default()
                });
                total_violations += report.violations.len();
                seeds_tested += 1;
            }
        }

        CertificationReport {
            passed: total_violations == 0,
            total_violations,
            seeds_tested,
        }
    }
}

#[derive(Debug, Default)]
struct ReadTally {
    reads: u64,
    misses: u64,
    torn: u64,
}

impl ReadTally {
    fn merge(&mut self, other: Self) {
        self.reads += other.reads;
        self.misses += other.misses;
        self.torn += other.torn;
    }
}

fn spawn_file_cells(kernel: &mut Kernel, cells: usize, files_per_cell: usize, failures: &mut usize) -> Vec<CellId> {
    let mut ids = Vec::with_capacity(cells);
    for c in 0..cells {
        let id = CellId::new(format!("stress{c}"));
        let cell = Cell::new(id.clone(), move |scope| {
            for i in 0..files_per_cell {
                let file = data::any_data(scope.ctx(), format!("cell {c} file {i}").into_bytes(), "bin")?;
                scope.bind(format!("s{c}_{i}"), file);
            }
            Ok(None)
        });
        match kernel.run([cell]) {
            Ok(outcomes) if outcomes.iter().all(|o| o.is_ok()) => {}
            _ => *failures += 1,
        }
        ids.push(id);
    }
    ids
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Report from a stress test
#[derive(Debug, Clone, Serialize)]
pub struct StressTestReport {
    pub cells: usize,
    pub files: usize,
    pub reads: u64,
    pub misses: u64,
    pub torn_reads: u64,
    pub leaked: usize,
    pub success: bool,
    pub elapsed_ms: u64,
}

/// Report from certification
#[derive(Debug, Clone, Serialize)]
pub struct CertificationReport {
    pub passed: bool,
    pub total_violations: usize,
    pub seeds_tested: u64,
}
