use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vfile_kernel::prelude::*;
use vfile_kernel::test_harness::{run_simulator, SimulatorConfig, TestHarness};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Command::new("vfile-kernel")
        .version(vfile_kernel::VERSION)
        .about("Virtual file registry kernel harness")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(std::path::PathBuf))
                .help("TOML kernel configuration"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("plain")
                .value_parser(["plain", "json"])
                .help("Log output format (filter with RUST_LOG)"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the seeded notebook simulator")
                .arg(
                    Arg::new("operations")
                        .long("operations")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("max-cells")
                        .long("max-cells")
                        .default_value("16")
                        .value_parser(value_parser!(usize))
                        .help("Upper bound on simultaneously defined cells"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Create files across many cells, delete them all, verify the registry drained")
                .arg(
                    Arg::new("cells")
                        .long("cells")
                        .default_value("100")
                        .value_parser(value_parser!(usize))
                        .help("Number of cells"),
                )
                .arg(
                    Arg::new("files")
                        .long("files")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Files per cell"),
                )
                .arg(
                    Arg::new("readers")
                        .long("readers")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent gateway readers during deletion"),
                ),
        )
        .subcommand(Command::new("certify").about("Run the simulator across seeds and dedup policies"))
        .subcommand(
            Command::new("report")
                .about("Run the embedding scenario and report registry state")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_one::<String>("log-format").map(String::as_str));

    let config = match matches.get_one::<std::path::PathBuf>("config") {
        Some(path) => KernelConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => KernelConfig::default(),
    };

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args, &config),
        Some(("stress", args)) => stress(args).await,
        Some(("certify", _)) => {
            let report = TestHarness::run_certification();
            println!("Certification Report:");
            println!("  Seeds Tested: {}", report.seeds_tested);
            println!("  Total Violations: {}", report.total_violations);
            println!("  Status: {}", if report.passed { "PASSED" } else { "FAILED" });
            Ok(exit(report.passed))
        }
        Some(("report", args)) => report(config, args.get_flag("json")),
        _ => {
            println!("vfile-kernel {}", vfile_kernel::VERSION);
            println!("Use --help for usage information");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(format: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if format == Some("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn simulate(args: &ArgMatches, config: &KernelConfig) -> anyhow::Result<ExitCode> {
    let sim = SimulatorConfig {
        seed: *args.get_one::<u64>("seed").context("seed")?,
        total_operations: *args.get_one::<u64>("operations").context("operations")?,
        max_cells: *args.get_one::<usize>("max-cells").context("max-cells")?,
        memo_capacity: config.memo_capacity,
        dedup: config.registry.dedup,
        stop_on_first_violation: args.get_flag("stop-on-violation"),
        ..Default::default()
    };
    let report = run_simulator(sim);
    println!("{}", report.generate_text());
    Ok(exit(report.passed()))
}

async fn stress(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let cells = *args.get_one::<usize>("cells").context("cells")?;
    let files = *args.get_one::<usize>("files").context("files")?;
    let readers = *args.get_one::<usize>("readers").context("readers")?;

    let report = if readers == 0 {
        TestHarness::run_stress_test(cells, files)
    } else {
        TestHarness::run_concurrent_stress(cells, files, readers).await
    };

    println!("Stress Test Report:");
    println!("  Cells: {}", report.cells);
    println!("  Files: {}", report.files);
    println!("  Reads: {} ({} not found)", report.reads, report.misses);
    println!("  Torn Reads: {}", report.torn_reads);
    println!("  Leaked: {}", report.leaked);
    println!("  Elapsed: {}ms", report.elapsed_ms);
    println!("  Success: {}", report.success);
    Ok(exit(report.success))
}

#[derive(Debug, Serialize)]
struct ScenarioStep {
    step: &'static str,
    refcount: usize,
    stats: vfile_registry::RegistryStats,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    version: &'static str,
    config: KernelConfig,
    steps: Vec<ScenarioStep>,
    drained: bool,
}

/// Memoized producer, an embedding cell, a rerun, then deletion of both.
fn report(config: KernelConfig, json: bool) -> anyhow::Result<ExitCode> {
    let mut kernel = Kernel::new(config.clone());
    let capacity = config.memo_capacity;
    let mut steps = Vec::new();

    kernel.run([Cell::new("cache", move |scope| {
        let producer = Function::new("create_vfile", |ctx, args| {
            let arg = args.first().map_or(Ok(0), Value::as_int)?;
            Ok(data::pdf(ctx, format!("hello world {arg}").into_bytes())?.into())
        });
        scope.bind("create_vfile", Arc::new(Memoized::new(producer, capacity)));
        Ok(None)
    })])?;
    kernel.run([Cell::new("embed", |scope| {
        let file = scope.call("create_vfile", &[Value::Int(1)])?;
        let md = RenderedOutput::markdown("").embed(file.as_file()?)?;
        scope.bind("md", md);
        Ok(None)
    })])?;

    let id = kernel
        .lookup("md")
        .and_then(|v| v.files().first().and_then(|f| f.id().cloned()));
    let mut record = |step: &'static str, kernel: &Kernel| {
        steps.push(ScenarioStep {
            step,
            refcount: id.as_ref().map_or(0, |id| kernel.registry().refcount(id)),
            stats: kernel.registry().stats(),
        });
    };

    record("embedded", &kernel);
    kernel.run([Cell::new("embed", |_| Ok(None))])?;
    record("embed cell cleared", &kernel);
    kernel.delete_cell(&CellId::new("cache"))?;
    record("cache deleted", &kernel);
    kernel.delete_cell(&CellId::new("embed"))?;
    record("all deleted", &kernel);

    let report = ScenarioReport {
        version: vfile_kernel::VERSION,
        drained: kernel.registry().is_empty(),
        config,
        steps,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Virtual File Report (v{})", report.version);
        for step in &report.steps {
            println!(
                "  {:<20} refcount={} entries={} bytes={} claims={}",
                step.step, step.refcount, step.stats.entries, step.stats.total_bytes, step.stats.claims
            );
        }
        println!("  Drained: {}", report.drained);
    }
    Ok(exit(report.drained))
}

fn exit(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
