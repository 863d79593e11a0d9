use crate::error::BinningError;
use crate::grid::{BinGrid, GridShape};
use crate::particle::{init_particles, Particle};
use crate::physics::{apply_force, move_particle, InteractionStats};
use anyhow::Result;
use log::{debug, info, trace, warn};
use rand::prelude::*;
use rayon::prelude::*;
use simulation_common::{SimParams, SimulationConfig, SummaryRecord, Vec2};
use std::time::{Duration, Instant};

/// How the force phase finds interaction partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Scan the 3x3 bin neighbourhood; bins are migrated every step.
    Binned,
    /// Scan every particle. O(N^2) baseline; bins are left untouched.
    AllPairs,
}

/// Receives the particle store at saved steps.
pub trait FrameSink {
    fn write_frame(&mut self, step: u32, params: &SimParams, particles: &[Particle]) -> Result<()>;
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub particles: usize,
    pub workers: usize,
    pub elapsed: Duration,
    /// Smallest pair distance seen, in cutoff units. `None` with bookkeeping off.
    pub min_distance: Option<f64>,
    /// Mean over steps of the per-step mean pair distance, in cutoff units.
    pub mean_distance: Option<f64>,
    pub migrations: u64,
}

impl RunReport {
    pub fn summary_record(&self) -> SummaryRecord {
        SummaryRecord {
            particles: self.particles,
            workers: self.workers,
            elapsed_secs: self.elapsed.as_secs_f64(),
        }
    }
}

/// Folds per-step statistics into run-level distance figures.
#[derive(Debug)]
struct DistanceTracker {
    abs_min: f64,
    mean_sum: f64,
    steps_with_pairs: u32,
}

impl Default for DistanceTracker {
    fn default() -> Self {
        Self { abs_min: 1.0, mean_sum: 0.0, steps_with_pairs: 0 }
    }
}

impl DistanceTracker {
    fn record(&mut self, stats: &InteractionStats) {
        if let Some(mean) = stats.mean_distance() {
            self.mean_sum += mean;
            self.steps_with_pairs += 1;
        }
        self.abs_min = self.abs_min.min(stats.min_distance);
    }

    fn mean(&self) -> f64 {
        if self.steps_with_pairs > 0 {
            self.mean_sum / self.steps_with_pairs as f64
        } else {
            0.0
        }
    }
}

/// Owns the particle store, the bin grid and the worker pool for one run.
pub struct Simulation {
    params: SimParams,
    particles: Vec<Particle>,
    /// Force-phase output, one slot per particle.
    accelerations: Vec<Vec2>,
    grid: BinGrid,
    pool: rayon::ThreadPool,
    workers: usize,
    mode: ForceMode,
    check_invariants: bool,
    current_step: u32,
    migrations: u64,
}

impl Simulation {
    /// Places `num_particles` particles and bins them.
    pub fn new(
        num_particles: usize,
        workers: usize,
        config: &SimulationConfig,
        mode: ForceMode,
    ) -> Result<Self> {
        if num_particles == 0 {
            anyhow::bail!("particle count must be greater than 0.");
        }
        let seed = config.run.seed.unwrap_or_else(|| rand::rng().random());
        info!("Placing {} particles (seed {}).", num_particles, seed);

        let mut rng = StdRng::seed_from_u64(seed);
        let domain_size = config.sim_params(num_particles).domain_size;
        let particles = init_particles(num_particles, domain_size, &mut rng)?;
        Self::from_particles(particles, workers, config, mode)
    }

    /// Builds a simulation around an existing particle store.
    pub fn from_particles(
        particles: Vec<Particle>,
        workers: usize,
        config: &SimulationConfig,
        mode: ForceMode,
    ) -> Result<Self> {
        if particles.is_empty() {
            anyhow::bail!("particle count must be greater than 0.");
        }
        if workers == 0 {
            anyhow::bail!("worker count must be greater than 0.");
        }
        config.validate()?;

        let n = particles.len();
        let params = config.sim_params(n);
        debug!("Simulation Parameters: {:#?}", params);

        let num_bins = n.div_ceil(config.run.particles_per_bin);
        let mut grid = BinGrid::new(num_bins, params.domain_size, config.run.initial_bin_capacity);
        let shape = grid.shape().clone();
        info!(
            "Grid: {} rows x {} cols, bins {:.5} x {:.5}, domain {:.5}.",
            shape.rows, shape.cols, shape.bin_width, shape.bin_height, params.domain_size
        );
        if mode == ForceMode::Binned && !shape.covers_cutoff(params.cutoff) {
            warn!(
                "Bin side ({:.5} x {:.5}) is below the cutoff {:.5}; neighbour scans may miss interactions.",
                shape.bin_width, shape.bin_height, params.cutoff
            );
        }
        grid.assign_all(&particles);
        debug!(
            "{} bins, fullest holds {} particles.",
            grid.num_bins(),
            grid.occupancy().into_iter().max().unwrap_or(0)
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("binning-worker-{}", i))
            .build()?;
        info!("Using {} worker threads ({:?} forces).", workers, mode);

        Ok(Self {
            params,
            accelerations: vec![Vec2::zero(); n],
            particles,
            grid,
            pool,
            workers,
            mode,
            check_invariants: config.run.check_invariants,
            current_step: 0,
            migrations: 0,
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn grid_shape(&self) -> &GridShape {
        self.grid.shape()
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Verifies the binning invariant against the current positions.
    pub fn check_partition(&mut self) -> Result<(), BinningError> {
        self.grid.check_partition(&self.particles)
    }

    // Each worker owns one contiguous chunk of particle indices
    fn chunk_len(&self) -> usize {
        self.particles.len().div_ceil(self.workers).max(1)
    }

    /// Advances the simulation by one step: forces, then move-and-migrate.
    /// The join at the end of each phase is the barrier for the next one.
    pub fn step(&mut self) -> Result<InteractionStats, BinningError> {
        let chunk = self.chunk_len();
        let Simulation { params, particles, accelerations, grid, pool, mode, .. } = self;
        let mode = *mode;

        let stats = pool.install(|| compute_forces(mode, chunk, params, particles, accelerations, grid));
        let migrated =
            pool.install(|| integrate_and_migrate(mode, chunk, params, particles, accelerations, grid))?;

        self.migrations += migrated;
        self.current_step += 1;

        if self.check_invariants && self.mode == ForceMode::Binned {
            self.check_partition()?;
        }
        Ok(stats)
    }

    /// Runs `steps` steps. With `bookkeeping` on, distance statistics are
    /// collected and `sink` receives the particles every `save_freq` steps.
    pub fn run(
        &mut self,
        steps: u32,
        save_freq: u32,
        bookkeeping: bool,
        mut sink: Option<&mut dyn FrameSink>,
    ) -> Result<RunReport> {
        let save_freq = save_freq.max(1);
        let mut tracker = DistanceTracker::default();

        info!("Starting simulation loop for {} steps...", steps);
        let start_time = Instant::now();
        let mut previous_print_time = start_time;

        for step in 0..steps {
            let step_start_time = Instant::now();
            let stats = self.step()?;

            if bookkeeping {
                tracker.record(&stats);
                if step % save_freq == 0 {
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write_frame(step, &self.params, &self.particles)?;
                    }
                }
            }
            let step_duration = step_start_time.elapsed();

            let now = Instant::now();
            let should_print_status = now.duration_since(previous_print_time).as_secs_f64() >= 5.0;
            if should_print_status || step + 1 == steps {
                info!(
                    "Step [{}/{}] | Migrations: {} | Step Time: {:6.3} ms | Elapsed: {:.2} s",
                    step + 1,
                    steps,
                    self.migrations,
                    step_duration.as_secs_f64() * 1000.0,
                    start_time.elapsed().as_secs_f64()
                );
                previous_print_time = now;
            } else {
                trace!(
                    "Step [{}/{}] completed in {:.3} ms ({} pairs)",
                    step + 1,
                    steps,
                    step_duration.as_secs_f64() * 1000.0,
                    stats.pairs
                );
            }
        }

        let elapsed = start_time.elapsed();
        Ok(RunReport {
            particles: self.particles.len(),
            workers: self.workers,
            elapsed,
            min_distance: bookkeeping.then_some(tracker.abs_min),
            mean_distance: bookkeeping.then(|| tracker.mean()),
            migrations: self.migrations,
        })
    }

    /// Releases the grid.
    pub fn finish(self) -> Vec<Particle> {
        self.grid.teardown();
        self.particles
    }
}

/// Force phase. Reads bins without locking; writes only each worker's own acceleration slots.
fn compute_forces(
    mode: ForceMode,
    chunk: usize,
    params: &SimParams,
    particles: &[Particle],
    accelerations: &mut [Vec2],
    grid: &mut BinGrid,
) -> InteractionStats {
    let view = grid.view();

    accelerations
        .par_chunks_mut(chunk)
        .enumerate()
        .map(|(worker, owned)| {
            let first = worker * chunk;
            let mut stats = InteractionStats::default();

            for (offset, acc) in owned.iter_mut().enumerate() {
                let i = first + offset;
                let particle = &particles[i];
                *acc = Vec2::zero();

                match mode {
                    ForceMode::Binned => {
                        let (row, col) = view.locate(particle.pos);
                        for bin in view.neighbors_of(row, col) {
                            for &j in bin.indices() {
                                // Don't compare particle to itself
                                if j != i {
                                    apply_force(acc, particle, &particles[j], params, &mut stats);
                                }
                            }
                        }
                    }
                    ForceMode::AllPairs => {
                        for (j, neighbor) in particles.iter().enumerate() {
                            if j != i {
                                apply_force(acc, particle, neighbor, params, &mut stats);
                            }
                        }
                    }
                }
            }
            stats
        })
        .reduce(InteractionStats::default, InteractionStats::merge)
}

/// Move phase. Each worker integrates its own particles and migrates the
/// ones that changed bin under the two bins' locks. Returns the migration count.
fn integrate_and_migrate(
    mode: ForceMode,
    chunk: usize,
    params: &SimParams,
    particles: &mut [Particle],
    accelerations: &[Vec2],
    grid: &BinGrid,
) -> Result<u64, BinningError> {
    let shape = grid.shape();

    particles
        .par_chunks_mut(chunk)
        .zip(accelerations.par_chunks(chunk))
        .enumerate()
        .map(|(worker, (owned, accs))| {
            let first = worker * chunk;
            let mut migrated = 0u64;

            for (offset, (particle, acc)) in owned.iter_mut().zip(accs).enumerate() {
                let (old_row, old_col) = grid.locate(particle.pos);
                particle.acc = *acc;
                move_particle(particle, params);

                if mode == ForceMode::AllPairs {
                    continue;
                }
                let (row, col) = grid.locate(particle.pos);
                if (row, col) != (old_row, old_col) {
                    grid.migrate(first + offset, shape.index(old_row, old_col), shape.index(row, col))?;
                    migrated += 1;
                }
            }
            Ok(migrated)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))
}
