use anyhow::Result;
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::{info, LevelFilter};
use std::path::PathBuf;

mod scaling;

use scaling::{parallel_scaling, serial_fit, ParallelScaling, SerialFit};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Complexity slope of single-worker runs over growing particle counts
    Serial,
    /// Strong and weak scaling against a single-worker baseline
    #[value(alias = "openmp", alias = "pthreads")]
    Parallel,
}

/// Command-line arguments for the scaling report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Summary file written by the engine's `-s` option
    #[arg(short = 's', long)]
    summary: PathBuf,

    /// What to grade
    #[arg(short = 'v', long, value_enum)]
    mode: Mode,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    let records = simulation_common::read_summary_log(&args.summary)?;
    info!("Read {} records from {}", records.len(), args.summary.display());

    match args.mode {
        Mode::Serial => print!("{}", render_serial(&serial_fit(&records)?)),
        Mode::Parallel => print!("{}", render_parallel(&parallel_scaling(&records)?)),
    }
    Ok(())
}

fn render_serial(fit: &SerialFit) -> String {
    let slopes: String = fit.pairwise_slopes.iter().map(|s| format!(" {:.6}", s)).collect();
    format!(
        "\nSerial code is O(N^slope)\nSlope estimates are :{}\nSlope estimate for line fit is: {:.6}\nSerial Grade = {:7.2}\n\n",
        slopes, fit.slope, fit.grade
    )
}

fn row(values: &[f64]) -> String {
    values.iter().map(|v| format!(" {:7.2}", v)).collect()
}

fn render_parallel(scaling: &ParallelScaling) -> String {
    let workers: String = scaling.workers.iter().map(|p| format!(" {:7}", p)).collect();
    let mut out = String::new();
    out.push_str("\nStrong scaling estimates are :\n");
    out.push_str(&format!("{} (speedup)\n", row(&scaling.strong_speedup)));
    out.push_str(&format!("{} (efficiency)    for\n", row(&scaling.strong_efficiency)));
    out.push_str(&format!("{} threads/processors\n\n", workers));
    out.push_str(&format!("Average strong scaling efficiency: {:7.2} \n\n", scaling.strong_average));
    out.push_str("Weak scaling estimates are :\n");
    out.push_str(&format!("{} (efficiency)    for\n", row(&scaling.weak_efficiency)));
    out.push_str(&format!("{} threads/processors\n\n", workers));
    out.push_str(&format!("Average weak scaling efficiency: {:7.2} \n\n", scaling.weak_average));
    out.push_str(&format!("\nParallel Grade = {:7.2}\n\n", scaling.grade));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation_common::SummaryRecord;

    #[test]
    fn mode_accepts_legacy_names() {
        let args = Args::try_parse_from(["scaling-report", "-s", "log.txt", "-v", "openmp"]).unwrap();
        assert_eq!(args.mode, Mode::Parallel);
        let args = Args::try_parse_from(["scaling-report", "-s", "log.txt", "-v", "serial"]).unwrap();
        assert_eq!(args.mode, Mode::Serial);
        assert!(Args::try_parse_from(["scaling-report", "-s", "log.txt", "-v", "mpi"]).is_err());
    }

    #[test]
    fn parallel_report_lists_worker_counts() {
        let records: Vec<SummaryRecord> = ["1000 1 4.0", "1000 1 4.0", "1000 2 2.0", "2000 2 4.0"]
            .iter()
            .map(|l| l.parse().unwrap())
            .collect();
        let text = render_parallel(&parallel_scaling(&records).unwrap());
        assert!(text.contains("       1       2 threads/processors"));
        assert!(text.contains("Parallel Grade =  100.00"));
    }

    #[test]
    fn serial_report_shows_fit() {
        let records: Vec<SummaryRecord> =
            ["1000 1.0", "2000 2.0"].iter().map(|l| l.parse().unwrap()).collect();
        let text = render_serial(&serial_fit(&records).unwrap());
        assert!(text.contains("Slope estimate for line fit is: 1.000000"));
        assert!(text.contains("Serial Grade =  100.00"));
    }
}
