pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod summary;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{OutputConfig, OutputFormat, PhysicsConfig, RunConfig, SimulationConfig};
pub use sim_params::SimParams;
pub use snapshot::Snapshot;
pub use summary::{read_summary_log, SummaryRecord};
pub use vecmath::Vec2;
