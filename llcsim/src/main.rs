use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use llclib::config::ExperimentConfig;
use llclib::io::load_trace;
use llclib::simulator::Simulator;
use llclib::util::{find_workloads, Workload};

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Last-level cache replacement policy simulator"))]
struct Args {
    config: String,
    /// A trace file, or a directory of <workload>.trace files
    trace: PathBuf,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,

    /// Log filter, e.g. "info" or "llclib=debug". Falls back to RUST_LOG, then "warn"
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).map_err(|e| format!("Invalid log level {level}: {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config_file = File::open(&args.config).map_err(|e| format!("Couldn't open the config file at path {}: {e}", args.config))?;
    let config: ExperimentConfig = serde_json::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    let workloads = workloads(&args.trace)?;
    for workload in &workloads {
        info!(workload = %workload.name, trace = %workload.trace.display(), "Simulating");
        let mut simulator = Simulator::new(&config).map_err(|e| format!("Couldn't build the caches: {e}"))?;
        let trace_file = File::open(&workload.trace).map_err(|e| format!("Couldn't open the trace file at path {}: {e}", workload.trace.display()))?;
        let trace = load_trace(trace_file).map_err(|e| format!("Couldn't read the trace file: {e}"))?;
        let result = simulator.simulate(&trace).map_err(|e| format!("Couldn't simulate {}: {e}", workload.name))?;
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "workload": workload.name,
            "result": result,
        })).map_err(|e| format!("Couldn't serialise the output {e}"))?);
        simulator.print_stats();
        if args.performance {
            let simulation_time = simulator.get_execution_time();
            println!("Simulation time for {}: {}s", workload.name, simulation_time.as_nanos() as f64 / 1e9);
        }
        if args.debug {
            let uninitialised_lines = simulator.get_uninitialised_line_counts();
            let formatted = config.caches
                .iter()
                .map(|c| c.name.clone())
                .zip(uninitialised_lines.iter())
                .map(|(name, count)| format!("{name}: {}", *count))
                .collect::<Vec<_>>()
                .join(", ");
            println!("Uninitialised cache lines by cache: ({formatted})");
        }
    }
    if args.performance {
        let total_time = start.elapsed();
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
    }
    Ok(())
}

/// The trace argument as a list of workloads
fn workloads(path: &Path) -> Result<Vec<Workload>, String> {
    if path.is_dir() {
        let found = find_workloads(path).map_err(|e| format!("Couldn't search {} for traces: {e}", path.display()))?;
        if found.is_empty() {
            return Err(format!("No .trace files found in {}", path.display()));
        }
        Ok(found)
    } else {
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "trace".to_string());
        Ok(vec![Workload { name, trace: path.to_path_buf() }])
    }
}
