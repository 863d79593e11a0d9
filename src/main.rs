use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;

// Define modules used by main
mod error;
mod grid;
mod output;
mod particle;
mod physics;
mod simulation;

use output::{SnapshotRecorder, TextTrajectory};
use simulation::{ForceMode, FrameSink, Simulation};
use simulation_common::{OutputFormat, SimulationConfig};

/// Minimum pair distance (cutoff units) below which particles are not interacting correctly.
const MIN_DISTANCE_FLOOR: f64 = 0.4;
/// Mean pair distance (cutoff units) below which most particles are not interacting.
const MEAN_DISTANCE_FLOOR: f64 = 0.8;

/// Command-line arguments for the simulation engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of particles
    #[arg(short = 'n', default_value_t = 1000)]
    particles: usize,

    /// Number of worker threads
    #[arg(short = 'p', default_value_t = 2)]
    workers: usize,

    /// Particle output file name
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Summary file name; one `particles workers seconds` line is appended per run
    #[arg(short = 's')]
    summary: Option<PathBuf>,

    /// Turns off all correctness checks and particle output
    #[arg(long = "no-output")]
    no_output: bool,

    /// Optional path to a config.toml with physics and run settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of steps (overrides the config)
    #[arg(long)]
    steps: Option<u32>,

    /// Placement seed (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Particle output format: text, json, bincode or messagepack (overrides the config)
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Compare every pair instead of scanning neighbouring bins
    #[arg(long)]
    all_pairs: bool,

    /// Write final particle positions to this CSV file
    #[arg(long)]
    positions_csv: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        "bincode" => Ok(OutputFormat::Bincode),
        "messagepack" => Ok(OutputFormat::Messagepack),
        other => Err(format!("unknown output format '{}'", other)),
    }
}

fn main() {
    // Initialize the logger
    env_logger::init();

    std::process::exit(exit_code(run_with_args(Args::parse())));
}

/// Logs a failed run once and maps it to the process exit status.
fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            1
        }
    }
}

fn run_with_args(args: Args) -> Result<()> {
    info!("Starting particle binning engine...");

    // --- Load Configuration ---
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    let bookkeeping = !args.no_output;

    let mode = if args.all_pairs { ForceMode::AllPairs } else { ForceMode::Binned };
    let mut sim = Simulation::new(args.particles, args.workers, &config, mode)?;

    // --- Output writer ---
    let mut text_sink = None;
    let mut recorder = None;
    if let (Some(path), true) = (&args.output, bookkeeping) {
        match config.output.format {
            OutputFormat::Text => text_sink = Some(TextTrajectory::create(path)?),
            format => recorder = Some(SnapshotRecorder::new(path, format)),
        }
    }
    let sink: Option<&mut dyn FrameSink> = match (text_sink.as_mut(), recorder.as_mut()) {
        (Some(s), _) => Some(s as &mut dyn FrameSink),
        (_, Some(r)) => Some(r as &mut dyn FrameSink),
        _ => None,
    };

    // --- Simulation Loop ---
    let report = sim.run(config.run.steps, config.run.save_freq, bookkeeping, sink)?;

    let mut line = format!(
        "n = {}, threads = {}, simulation time = {} seconds",
        report.particles,
        report.workers,
        report.elapsed.as_secs_f64()
    );
    if let (Some(min), Some(mean)) = (report.min_distance, report.mean_distance) {
        line.push_str(&format!(", absmin = {:.6}, absavg = {:.6}", min, mean));
        if min < MIN_DISTANCE_FLOOR {
            warn!("The minimum distance is below {} meaning that some particle is not interacting", MIN_DISTANCE_FLOOR);
        }
        if mean < MEAN_DISTANCE_FLOOR {
            warn!("The average distance is below {} meaning that most particles are not interacting", MEAN_DISTANCE_FLOOR);
        }
    }
    println!("{}", line);
    let shape = sim.grid_shape();
    info!(
        "{} steps on a {} x {} grid over a {:.5} domain, {} bin migrations.",
        sim.current_step(),
        shape.rows,
        shape.cols,
        sim.params().domain_size,
        report.migrations
    );

    // --- Save Recorded Data ---
    if let Some(sink) = text_sink {
        sink.finish()?;
    }
    if let Some(recorder) = recorder {
        recorder.save()?;
    }
    if let Some(path) = &args.summary {
        output::append_summary(path, &report.summary_record())?;
        info!("Summary appended to {}", path.display());
    }

    if let Some(path) = &args.positions_csv {
        output::write_positions_csv(path, sim.particles())?;
    }
    sim.finish();

    info!("Simulation Complete.");
    Ok(())
}
