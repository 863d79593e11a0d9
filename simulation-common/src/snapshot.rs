use serde::{Serialize, Deserialize};

/// Particle positions at a saved step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The step after which the snapshot was taken.
    pub step: u32,
    /// Side length of the square domain.
    pub domain_size: f64,
    /// `[x, y]` of every particle, indexed by particle slot.
    pub positions: Vec<(f64, f64)>,
}
