//! Scaling estimates and grades computed from summary logs.
//!
//! Serial logs hold one record per problem size; the grade is driven by the
//! slope of `ln t` against `ln n`. Parallel logs start with a single-worker
//! baseline, followed by the strong-scaling runs (fixed size, growing worker
//! count) and then the weak-scaling runs (size grows with the worker count).

use anyhow::Result;
use simulation_common::SummaryRecord;

/// Fit of run time against particle count.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialFit {
    /// Slope between each pair of consecutive records.
    pub pairwise_slopes: Vec<f64>,
    /// Least-squares slope over all records.
    pub slope: f64,
    pub grade: f64,
}

/// Strong and weak scaling estimates for a parallel log.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelScaling {
    /// Worker counts of the strong-scaling runs, one per estimate below.
    pub workers: Vec<usize>,
    pub strong_speedup: Vec<f64>,
    pub strong_efficiency: Vec<f64>,
    pub weak_efficiency: Vec<f64>,
    pub strong_average: f64,
    pub weak_average: f64,
    pub strong_grade: f64,
    pub weak_grade: f64,
    pub grade: f64,
}

fn check_records(records: &[SummaryRecord], needed: usize) -> Result<()> {
    if records.len() < needed {
        anyhow::bail!(
            "need at least {} summary records, found {}",
            needed,
            records.len()
        );
    }
    if let Some(bad) = records.iter().find(|r| r.particles == 0 || r.elapsed_secs <= 0.0) {
        anyhow::bail!("summary record '{}' has a non-positive size or time", bad);
    }
    Ok(())
}

/// Grade for a serial complexity slope: full marks below 1.3, nothing from 2 upward.
pub fn serial_grade(slope: f64) -> f64 {
    if slope < 1.3 {
        100.0
    } else if slope < 1.5 {
        75.0 + (1.5 - slope) / 0.2 * 25.0
    } else if slope < 2.0 {
        (2.0 - slope) / 0.5 * 75.0
    } else {
        0.0
    }
}

/// Grade for an average parallel efficiency.
pub fn efficiency_grade(efficiency: f64) -> f64 {
    if efficiency > 0.8 {
        100.0
    } else if efficiency > 0.5 {
        75.0 + 25.0 * (efficiency - 0.5) / 0.3
    } else {
        efficiency / 0.5 * 75.0
    }
}

pub fn serial_fit(records: &[SummaryRecord]) -> Result<SerialFit> {
    check_records(records, 2)?;

    let points: Vec<(f64, f64)> = records
        .iter()
        .map(|r| ((r.particles as f64).ln(), r.elapsed_secs.ln()))
        .collect();

    let pairwise_slopes = points
        .windows(2)
        .map(|w| (w[1].1 - w[0].1) / (w[1].0 - w[0].0))
        .collect();

    let count = points.len() as f64;
    let (sx, sy, sxy, sx2) = points.iter().fold((0.0, 0.0, 0.0, 0.0), |(sx, sy, sxy, sx2), &(x, y)| {
        (sx + x, sy + y, sxy + x * y, sx2 + x * x)
    });
    let denominator = sx2 - sx * sx / count;
    if denominator.abs() < f64::EPSILON {
        anyhow::bail!("serial log needs at least two different particle counts");
    }
    let slope = (sxy - sx * sy / count) / denominator;

    Ok(SerialFit { pairwise_slopes, slope, grade: serial_grade(slope) })
}

pub fn parallel_scaling(records: &[SummaryRecord]) -> Result<ParallelScaling> {
    check_records(records, 2)?;

    let t0 = records[0].elapsed_secs;
    let num = records.len() / 2;
    let strong = &records[1..=num];

    let workers: Vec<usize> = strong.iter().map(|r| r.workers).collect();
    let strong_speedup: Vec<f64> = strong.iter().map(|r| t0 / r.elapsed_secs).collect();
    let strong_efficiency: Vec<f64> = strong_speedup
        .iter()
        .zip(&workers)
        .map(|(speedup, &p)| speedup / p as f64)
        .collect();

    // The first strong run doubles as the first weak run
    let weak_efficiency: Vec<f64> = std::iter::once(&records[1])
        .chain(&records[num + 1..2 * num])
        .map(|r| t0 / r.elapsed_secs)
        .collect();

    let strong_average = mean(&strong_efficiency);
    let weak_average = mean(&weak_efficiency);
    let strong_grade = efficiency_grade(strong_average);
    let weak_grade = efficiency_grade(weak_average);

    Ok(ParallelScaling {
        workers,
        strong_speedup,
        strong_efficiency,
        weak_efficiency,
        strong_average,
        weak_average,
        strong_grade,
        weak_grade,
        grade: 0.5 * strong_grade + 0.5 * weak_grade,
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
