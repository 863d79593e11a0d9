use crate::particle::Particle;
use crate::simulation::FrameSink;
use anyhow::{Context, Result};
use log::info;
use simulation_common::{OutputFormat, SimParams, Snapshot, SummaryRecord};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Streams saved steps as plain text: a `N domain_size` header, then one `x y` line per particle.
pub struct TextTrajectory<W: Write> {
    out: W,
    header_written: bool,
}

impl TextTrajectory<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref)
            .with_context(|| format!("Failed to create trajectory file '{}'", path_ref.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TextTrajectory<W> {
    pub fn new(out: W) -> Self {
        Self { out, header_written: false }
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> FrameSink for TextTrajectory<W> {
    fn write_frame(&mut self, _step: u32, params: &SimParams, particles: &[Particle]) -> Result<()> {
        if !self.header_written {
            writeln!(self.out, "{} {}", particles.len(), params.domain_size)?;
            self.header_written = true;
        }
        for p in particles {
            writeln!(self.out, "{} {}", p.pos.x, p.pos.y)?;
        }
        Ok(())
    }
}

/// Collects saved steps in memory and serializes them all at the end of the run.
pub struct SnapshotRecorder {
    path: PathBuf,
    format: OutputFormat,
    snapshots: Vec<Snapshot>,
}

impl SnapshotRecorder {
    pub fn new<P: Into<PathBuf>>(path: P, format: OutputFormat) -> Self {
        Self { path: path.into(), format, snapshots: Vec::new() }
    }

    /// Writes every recorded snapshot in the configured format.
    pub fn save(&self) -> Result<()> {
        let filename = &self.path;
        let file = File::create(filename)
            .with_context(|| format!("Error creating snapshot file '{}'", filename.display()))?;
        let mut writer = BufWriter::new(file);

        match self.format {
            OutputFormat::Json => serde_json::to_writer(&mut writer, &self.snapshots)
                .context("Error serializing snapshots to JSON")?,
            OutputFormat::Bincode => bincode::serialize_into(&mut writer, &self.snapshots)
                .context("Error serializing snapshots to bincode")?,
            OutputFormat::Messagepack => rmp_serde::encode::write(&mut writer, &self.snapshots)
                .context("Error serializing snapshots to MessagePack")?,
            OutputFormat::Text => anyhow::bail!("text output is streamed, not recorded"),
        }
        writer.flush()?;

        info!(
            "{} snapshots saved to {} ({:?} format)",
            self.snapshots.len(),
            filename.display(),
            self.format
        );
        Ok(())
    }
}

impl FrameSink for SnapshotRecorder {
    fn write_frame(&mut self, step: u32, params: &SimParams, particles: &[Particle]) -> Result<()> {
        self.snapshots.push(Snapshot {
            step,
            domain_size: params.domain_size,
            positions: particles.iter().map(|p| (p.pos.x, p.pos.y)).collect(),
        });
        Ok(())
    }
}

/// Writes final positions as CSV.
pub fn write_positions_csv<P: AsRef<Path>>(path: P, particles: &[Particle]) -> Result<()> {
    let path_ref = path.as_ref();
    let mut writer = csv::Writer::from_path(path_ref)
        .with_context(|| format!("Error saving CSV file '{}'", path_ref.display()))?;
    writer.write_record(["x", "y"])?;
    for p in particles {
        writer.write_record(&[format!("{:.6}", p.pos.x), format!("{:.6}", p.pos.y)])?;
    }
    writer.flush()?;
    info!("Final positions saved to {}", path_ref.display());
    Ok(())
}

/// Appends one run's record to a summary log, creating it if needed.
pub fn append_summary<P: AsRef<Path>>(path: P, record: &SummaryRecord) -> Result<()> {
    let path_ref = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path_ref)
        .with_context(|| format!("Failed to open summary file '{}'", path_ref.display()))?;
    writeln!(file, "{}", record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation_common::{SimulationConfig, Vec2};

    fn sample() -> (SimParams, Vec<Particle>) {
        let params = SimulationConfig::default().sim_params(2);
        let particles = vec![
            Particle::at(Vec2::new(0.25, 0.5), Vec2::zero()),
            Particle::at(Vec2::new(0.125, 0.75), Vec2::zero()),
        ];
        (params, particles)
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("particle-binning-{}-{}", std::process::id(), name))
    }

    #[test]
    fn text_trajectory_writes_header_once() {
        let (params, particles) = sample();
        let mut sink = TextTrajectory::new(Vec::new());
        sink.write_frame(0, &params, &particles).unwrap();
        sink.write_frame(10, &params, &particles).unwrap();
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], format!("2 {}", params.domain_size));
        assert_eq!(lines[1], "0.25 0.5");
        assert_eq!(lines[4], "0.125 0.75");
    }

    #[test]
    fn recorder_round_trips_through_json_and_bincode() {
        let (params, particles) = sample();

        let json_path = scratch_path("frames.json");
        let mut recorder = SnapshotRecorder::new(&json_path, OutputFormat::Json);
        recorder.write_frame(0, &params, &particles).unwrap();
        recorder.write_frame(10, &params, &particles).unwrap();
        recorder.save().unwrap();
        let loaded: Vec<Snapshot> =
            serde_json::from_reader(File::open(&json_path).unwrap()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].step, 10);
        assert_eq!(loaded[0].positions, vec![(0.25, 0.5), (0.125, 0.75)]);
        std::fs::remove_file(&json_path).ok();

        let bin_path = scratch_path("frames.bin");
        let mut recorder = SnapshotRecorder::new(&bin_path, OutputFormat::Bincode);
        recorder.write_frame(3, &params, &particles).unwrap();
        recorder.save().unwrap();
        let loaded: Vec<Snapshot> =
            bincode::deserialize_from(File::open(&bin_path).unwrap()).unwrap();
        assert_eq!(loaded[0].step, 3);
        assert_eq!(loaded[0].positions.len(), 2);
        std::fs::remove_file(&bin_path).ok();
    }

    #[test]
    fn recorder_refuses_text_format() {
        let path = scratch_path("frames.txt");
        let recorder = SnapshotRecorder::new(&path, OutputFormat::Text);
        assert!(recorder.save().is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn summary_lines_accumulate() {
        let path = scratch_path("summary.txt");
        std::fs::remove_file(&path).ok();
        let first = SummaryRecord { particles: 1000, workers: 1, elapsed_secs: 2.0 };
        let second = SummaryRecord { particles: 1000, workers: 4, elapsed_secs: 0.5 };
        append_summary(&path, &first).unwrap();
        append_summary(&path, &second).unwrap();

        let records = simulation_common::read_summary_log(&path).unwrap();
        assert_eq!(records, vec![first, second]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn csv_has_header_and_one_row_per_particle() {
        let (_, particles) = sample();
        let path = scratch_path("final.csv");
        write_positions_csv(&path, &particles).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["x,y", "0.250000,0.500000", "0.125000,0.750000"]);
        std::fs::remove_file(&path).ok();
    }
}
