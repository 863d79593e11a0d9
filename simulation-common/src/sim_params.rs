use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used on every kernel call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Square domain [0, domain_size]^2
    pub domain_size: f64,

    // Interaction
    pub cutoff: f64,
    pub cutoff_sq: f64,
    pub min_r_sq: f64, // Pair distances are clamped to at least min_r
    pub mass: f64,

    // Time
    pub dt: f64,
}
