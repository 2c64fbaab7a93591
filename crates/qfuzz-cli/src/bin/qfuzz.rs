//! Generate random programs, run them on every scenario and write the
//! feature table.
//!
//! # Usage
//!
//! ```bash
//! # 30 programs on 4 slots, ideal simulation only
//! qfuzz --toolkit ./toolkit.py
//!
//! # Add a noisy simulation biased by a device's noise profile
//! qfuzz --toolkit ./toolkit.py --noise-backend fake_kyiv --random-init
//!
//! # Also run on hardware, with a 10 minute budget per pair
//! qfuzz --toolkit ./toolkit.py --hardware ibm_kyiv --timeout-secs 600 --json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use qfuzz::output::{format_summary, write_csv_file, write_json_file};
use qfuzz::{
    noisy_scenario, CancelToken, Catalog, CommandExecutionService, CommandNoiseProvider, Config,
    FuzzOptions, Fuzzer, NoiseProfileCache, NoiseProvider, OutlierPolicy, Pipeline, Program,
    Scenario,
};
use qfuzz_cli::{init_tracing, parse_outlier};

/// Randomized program fuzzing with cross-backend comparison
#[derive(Parser, Debug)]
#[command(name = "qfuzz")]
#[command(about = "Run random programs on several backends and tabulate how they differ")]
#[command(version)]
struct Args {
    /// Toolkit executable that compiles, runs and characterizes backends
    #[arg(long, default_value = "qfuzz-toolkit")]
    toolkit: PathBuf,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of programs to generate
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    programs: Option<u64>,

    /// Resource slots per program
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    slots: Option<u64>,

    /// Random operations per program
    #[arg(short = 'd', long)]
    operations: Option<usize>,

    /// Shots per execution
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    shots: Option<u32>,

    /// Repetitions per (program, scenario) pair
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    repetitions: Option<u64>,

    /// Start every program with one spread operation per slot
    #[arg(long)]
    random_init: bool,

    /// Seed for reproducible program batches
    #[arg(long)]
    seed: Option<u64>,

    /// Restrict the catalog to kinds acting on at most this many slots
    #[arg(long)]
    max_arity: Option<usize>,

    /// Simulator backend for the ideal scenario
    #[arg(short, long, default_value = "aer_simulator")]
    backend: String,

    /// Device whose noise profile biases an extra `noisy` scenario
    #[arg(long)]
    noise_backend: Option<String>,

    /// Physical device for an extra `hardware` scenario
    #[arg(long)]
    hardware: Option<String>,

    /// Outlier policy for timing samples: iqr[:fence] or relative[:k[@r]]
    #[arg(long, value_parser = parse_outlier)]
    outlier: Option<OutlierPolicy>,

    /// Give up on a (program, scenario) pair after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory of the day-keyed noise profile cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output directory for the feature table
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Also write the feature table as JSON
    #[arg(long)]
    json: bool,

    /// Write every generated program into this directory, as text and JSON
    #[arg(long)]
    save_programs: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    // Generate
    let mut catalog = Catalog::standard();
    if let Some(max) = args.max_arity {
        catalog = catalog.up_to_arity(max)?;
    }
    let programs = Fuzzer::from_seed(catalog, config.fuzz.seed).generate(
        config.fuzz.program_count,
        config.fuzz.slot_count,
        config.fuzz.operation_count,
        &FuzzOptions::from(&config.fuzz),
    )?;
    if let Some(dir) = &args.save_programs {
        save_programs(&programs, dir)?;
    }

    // Scenarios
    let cache = NoiseProfileCache::new(&config.cache_dir);
    let provider = CommandNoiseProvider::new(qfuzz::Toolkit::new(&args.toolkit));
    let mut scenarios = vec![Scenario::ideal(&args.backend, config.shots)];
    if let Some(device) = &args.noise_backend {
        scenarios.push(noisy_scenario(
            &cache,
            &provider,
            &args.backend,
            device,
            config.shots,
        )?);
    }
    if let Some(device) = &args.hardware {
        let profile = cache.get(device, |b| provider.fetch_profile(b))?;
        scenarios.push(
            Scenario::hardware(device, config.shots).with_calibration(profile.properties),
        );
    }

    // Run
    let total = (programs.len() * scenarios.len()) as u64;
    let progress_bar = ProgressBar::new(total);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}")?
            .progress_chars("=>-"),
    );
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar.set_message("starting...");

    let start = Instant::now();
    let service = CommandExecutionService::new(qfuzz::Toolkit::new(&args.toolkit));
    let table = Pipeline::new(service, config).run(
        &programs,
        &scenarios,
        &CancelToken::new(),
        |report| {
            progress_bar.inc(1);
            let status = match report.error {
                Some(kind) => format!("{} ({kind})", report.scenario),
                None => report.scenario.to_string(),
            };
            progress_bar.set_message(format!("{} on {status}", report.program_id));
        },
    )?;
    progress_bar.finish_with_message("done");

    println!("\nCompleted in {:.1}s\n", start.elapsed().as_secs_f64());

    // Write outputs
    fs::create_dir_all(&args.output)?;
    let csv_path = args.output.join("features.csv");
    write_csv_file(&table, &csv_path)?;
    println!("Wrote feature table to: {}", csv_path.display());
    if args.json {
        let json_path = args.output.join("features.json");
        write_json_file(&table, &json_path)?;
        println!("Wrote JSON to: {}", json_path.display());
    }

    println!("\n{}", format_summary(&table));
    Ok(())
}

fn build_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    // Apply command-line overrides
    if let Some(n) = args.programs {
        config = config.program_count(usize::try_from(n)?);
    }
    if let Some(n) = args.slots {
        config = config.slot_count(usize::try_from(n)?);
    }
    if let Some(n) = args.operations {
        config = config.operation_count(n);
    }
    if let Some(shots) = args.shots {
        config = config.shots(shots);
    }
    if let Some(n) = args.repetitions {
        config = config.repetitions(usize::try_from(n)?);
    }
    if args.random_init {
        config = config.random_init(true);
    }
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }
    if let Some(policy) = args.outlier {
        config = config.outlier_policy(policy);
    }
    if let Some(secs) = args.timeout_secs.filter(|s| *s > 0) {
        config = config.timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &args.cache_dir {
        config = config.cache_dir(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn save_programs(programs: &[Program], dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    for p in programs {
        fs::write(dir.join(format!("{}.txt", p.id())), p.to_string())?;
        fs::write(
            dir.join(format!("{}.json", p.id())),
            serde_json::to_string_pretty(p)?,
        )?;
    }
    tracing::info!(count = programs.len(), dir = %dir.display(), "saved programs");
    Ok(())
}
