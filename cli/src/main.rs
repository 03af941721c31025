//! Bed occupancy simulator CLI
//!
//! Runs a demo session: builds (or loads) a hospital, walks the days
//! forward, optionally lets a voice agent call the first queued patient each
//! day, rolls back, and prints the tables and statistics.

use std::path::PathBuf;
use std::process::ExitCode;

use bed_occupancy_core::agent::{AlwaysConsent, NeverConsent, ScriptedAgent, VoiceAgent};
use bed_occupancy_core::models::MetricValue;
use bed_occupancy_core::orchestrator::{SimulationConfig, SimulationEngine, SimulationError, Tables};
use bed_occupancy_core::repository::InMemoryRepository;
use bed_occupancy_core::scenario::{GeneratorConfig, Scenario};
use bed_occupancy_core::stats::MetricStatistics;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Bed occupancy simulation demo
#[derive(Parser, Debug)]
#[command(name = "bed-occupancy")]
#[command(about = "Run a deterministic hospital bed occupancy simulation", long_about = None)]
struct Args {
    /// RNG seed (overrides the config file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of days to advance
    #[arg(short, long, default_value = "5")]
    days: u32,

    /// Days to roll back after advancing
    #[arg(long, default_value = "0")]
    rollback: u32,

    /// JSON simulation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON scenario (generated when absent)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Beds in a generated scenario
    #[arg(long, default_value = "10")]
    beds: u32,

    /// Patients in a generated scenario
    #[arg(long, default_value = "30")]
    patients: u32,

    /// Use the extended model (admission days, department pools)
    #[arg(long)]
    extended: bool,

    /// Voice agent answers each day: always, never, or a pattern like "yny"
    #[arg(long)]
    calls: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the final tables as JSON
    #[arg(long)]
    json: bool,

    /// Export a resumable snapshot to this file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn build_agent(pattern: &str) -> Box<dyn VoiceAgent> {
    match pattern {
        "always" => Box::new(AlwaysConsent),
        "never" => Box::new(NeverConsent),
        answers => Box::new(ScriptedAgent::new(
            answers.chars().map(|c| c.eq_ignore_ascii_case(&'y')),
        )),
    }
}

fn run(args: &Args) -> Result<(), SimulationError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None if args.extended => SimulationConfig::extended(),
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    config.validate()?;

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => {
            let generator = GeneratorConfig {
                beds: args.beds,
                patients: args.patients,
                admission_horizon: args.extended.then_some(config.max_day),
                stay_length: config.stay_length,
                ..GeneratorConfig::default()
            };
            Scenario::generate(&generator, config.rng_seed)
        }
    };

    info!(seed = config.rng_seed, days = args.days, "starting simulation");
    let mut engine = SimulationEngine::new(config, InMemoryRepository::new(scenario.into_state()?))?;
    let mut agent = args.calls.as_deref().map(build_agent);

    for _ in 0..args.days {
        if let Some(agent) = agent.as_mut() {
            if let Some(candidate) = engine.call_candidate()? {
                match engine.call_patient(candidate.entry_id, &mut **agent) {
                    Ok(outcome) => info!(
                        "Called {} {}: {}",
                        candidate.first_name,
                        candidate.last_name,
                        if outcome.consented { "consented" } else { "declined" }
                    ),
                    Err(err @ SimulationError::Agent(_)) => warn!("Call failed: {}", err),
                    Err(err) if err.is_retryable() => warn!("{}", err),
                    Err(err) => return Err(err),
                }
            }
        }
        engine.advance(1)?;
        engine.materialize()?;
    }
    for _ in 0..args.rollback {
        engine.advance(-1)?;
    }

    let tables = engine.tables()?;
    if args.json {
        let json = serde_json::to_string_pretty(&tables)
            .map_err(|e| SimulationError::SerializationError(e.to_string()))?;
        println!("{}", json);
    } else {
        print_tables(&tables);
    }

    if let Some(path) = &args.export {
        let json = engine.export_snapshot()?.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            SimulationError::SerializationError(format!("Cannot write {}: {}", path.display(), e))
        })?;
        info!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn print_tables(tables: &Tables) {
    println!("Day {}", tables.day);
    println!();
    println!("{:<5} {:<16} {:<28} {:<26} {:>4}", "Bed", "Department", "Patient", "Procedure", "Stay");
    for bed in &tables.beds {
        println!(
            "{:<5} {:<16} {:<28} {:<26} {:>4}",
            bed.bed_id.0,
            bed.department.as_deref().unwrap_or("-"),
            bed.patient_name.as_deref().unwrap_or("(free)"),
            bed.procedure.as_deref().unwrap_or("-"),
            bed.days_of_stay
        );
    }

    println!();
    println!("{:<4} {:<28} {:<8} {:<20} {:<16}", "Pos", "Patient", "PESEL", "Sickness", "Department");
    for row in &tables.queue {
        println!(
            "{:<4} {:<28} {:<8} {:<20} {:<16}",
            row.position,
            row.patient_name,
            row.pesel,
            row.sickness,
            row.department.as_deref().unwrap_or("-")
        );
    }

    if !tables.no_shows.is_empty() {
        println!();
        println!("No-shows today:");
        for no_show in &tables.no_shows {
            println!("  {} (patient {})", no_show.patient_name, no_show.patient_id);
        }
    }

    let stats = &tables.statistics;
    println!();
    println!("{:<14} {:>22} {:>22} {:>22} {:>22}", "Metric", "Today", "Delta", "Average", "Avg delta");
    print_metric("Occupancy %", &stats.occupancy);
    print_metric("Avg stay", &stats.average_stay);
    print_metric("No-shows %", &stats.no_shows);
    print_metric("Consents %", &stats.consents);
}

fn print_metric(name: &str, metric: &MetricStatistics) {
    fn show(value: MetricValue) -> String {
        match value {
            MetricValue::Value(v) => format!("{:.2}", v),
            MetricValue::Missing(sentinel) => sentinel.as_str().to_string(),
        }
    }
    println!(
        "{:<14} {:>22} {:>22} {:>22} {:>22}",
        name,
        show(metric.current),
        show(metric.delta),
        show(metric.average),
        show(metric.average_delta)
    );
}
