use vfile_kernel::test_harness::{run_simulator, SimulatorConfig, TestHarness};
use vfile_registry::DedupPolicy;

#[test]
fn test_stress_many_cells() {
    let report = TestHarness::run_stress_test(50, 20);
    assert!(report.success, "{report:?}");
    assert_eq!(report.files, 1_000);
    assert_eq!(report.leaked, 0);
}

#[test]
fn test_simulator_seeds() {
    for seed in [1, 2, 3] {
        for dedup in [DedupPolicy::Independent, DedupPolicy::ContentHash] {
            let report = run_simulator(SimulatorConfig {
                seed,
                total_operations: 500,
                dedup,
                ..Default::default()
            });
            assert!(report.passed(), "{}", report.generate_text());
        }
    }
}

#[test]
fn test_simulator_report_text() {
    let report = run_simulator(SimulatorConfig {
        total_operations: 50,
        ..Default::default()
    });
    let text = report.generate_text();
    assert!(text.contains("Seed: 42"));
    assert!(text.contains("=== Result: PASS ==="));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stats"]["operations"], 50);
}
