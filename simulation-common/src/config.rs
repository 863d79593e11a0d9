use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::path::Path;

// Physical constants of the particle system
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PhysicsConfig {
    /// Particles per unit area; the domain side is sqrt(density * n).
    #[serde(default = "default_density")]
    pub density: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Interaction cutoff radius.
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
    /// Lower clamp on pair distance, as a fraction of the cutoff.
    #[serde(default = "default_min_r_fraction")]
    pub min_r_fraction: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,
}

// Step count, placement seed and binning knobs
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Output writer is invoked every `save_freq` steps.
    #[serde(default = "default_save_freq")]
    pub save_freq: u32,
    /// Seed for initial placement. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Target mean occupancy; the grid has ceil(n / particles_per_bin) bins.
    #[serde(default = "default_particles_per_bin")]
    pub particles_per_bin: usize,
    #[serde(default = "default_initial_bin_capacity")]
    pub initial_bin_capacity: usize,
    /// Verify the binning invariant after every step (slow, debugging only).
    #[serde(default)]
    pub check_invariants: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Streamed `x y` lines per saved step.
    Text,
    Json,
    Bincode,
    Messagepack,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            density: default_density(),
            mass: default_mass(),
            cutoff: default_cutoff(),
            min_r_fraction: default_min_r_fraction(),
            dt: default_dt(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            steps: default_steps(),
            save_freq: default_save_freq(),
            seed: None,
            particles_per_bin: default_particles_per_bin(),
            initial_bin_capacity: default_initial_bin_capacity(),
            check_invariants: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { format: default_output_format() }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: SimulationConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.physics.density <= 0.0 {
            anyhow::bail!("density must be positive.");
        }
        if self.physics.mass <= 0.0 {
            anyhow::bail!("mass must be positive.");
        }
        if self.physics.cutoff <= 0.0 {
            anyhow::bail!("cutoff must be positive.");
        }
        if !(self.physics.min_r_fraction > 0.0 && self.physics.min_r_fraction < 1.0) {
            anyhow::bail!("min_r_fraction must lie in (0, 1).");
        }
        if self.physics.dt <= 0.0 {
            anyhow::bail!("dt must be positive.");
        }
        if self.run.save_freq == 0 {
            anyhow::bail!("save_freq must be greater than 0.");
        }
        if self.run.particles_per_bin == 0 {
            anyhow::bail!("particles_per_bin must be greater than 0.");
        }
        if self.run.initial_bin_capacity == 0 {
            anyhow::bail!("initial_bin_capacity must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters for `num_particles` particles.
    pub fn sim_params(&self, num_particles: usize) -> SimParams {
        let physics = &self.physics;
        let domain_size = (physics.density * num_particles as f64).sqrt();
        let min_r = physics.cutoff * physics.min_r_fraction;

        SimParams {
            domain_size,
            cutoff: physics.cutoff,
            cutoff_sq: physics.cutoff * physics.cutoff,
            min_r_sq: min_r * min_r,
            mass: physics.mass,
            dt: physics.dt,
        }
    }
}

fn default_density() -> f64 {
    0.0005
}

fn default_mass() -> f64 {
    0.01
}

fn default_cutoff() -> f64 {
    0.01
}

fn default_min_r_fraction() -> f64 {
    0.01
}

fn default_dt() -> f64 {
    0.0005
}

fn default_steps() -> u32 {
    1000
}

fn default_save_freq() -> u32 {
    10
}

fn default_particles_per_bin() -> usize {
    4
}

fn default_initial_bin_capacity() -> usize {
    20
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Text
}
