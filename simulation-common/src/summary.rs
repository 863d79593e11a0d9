//! One line per run in a summary log: `particles workers elapsed_seconds`.
//!
//! Serial baselines written by older tooling carry only two columns
//! (`particles elapsed_seconds`); those parse as single-worker records.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRecord {
    pub particles: usize,
    pub workers: usize,
    pub elapsed_secs: f64,
}

impl fmt::Display for SummaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.particles, self.workers, self.elapsed_secs)
    }
}

impl FromStr for SummaryRecord {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (particles, workers, elapsed) = match fields.as_slice() {
            [n, t] => (*n, "1", *t),
            [n, p, t] => (*n, *p, *t),
            _ => anyhow::bail!("expected 2 or 3 fields in summary line '{}'", line),
        };

        let record = SummaryRecord {
            particles: particles
                .parse()
                .with_context(|| format!("bad particle count '{}'", particles))?,
            workers: workers
                .parse()
                .with_context(|| format!("bad worker count '{}'", workers))?,
            elapsed_secs: elapsed
                .parse()
                .with_context(|| format!("bad elapsed time '{}'", elapsed))?,
        };
        if record.workers == 0 {
            anyhow::bail!("worker count must be positive in summary line '{}'", line);
        }
        Ok(record)
    }
}

/// Reads every non-blank line of a summary log.
pub fn read_summary_log<P: AsRef<Path>>(path: P) -> Result<Vec<SummaryRecord>> {
    let path_ref = path.as_ref();
    let text = std::fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read summary file '{}'", path_ref.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.parse()
                .with_context(|| format!("{}:{}", path_ref.display(), i + 1))
        })
        .collect()
}
