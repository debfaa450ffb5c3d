//! Error types for the compute helper and the simulation built on it.
//!
//! Driver failures are typed values rather than printed strings; each one still
//! carries the numeric status code of the classic compute API so it can be
//! reported through the [`status_name`] table.

mod compute_error;
mod simulation_error;
pub mod status;

pub use compute_error::ComputeError;
pub use simulation_error::SimulationError;
pub use status::{show_status, status_name};

/// Result type alias for compute-layer operations.
pub type ComputeResult<T> = std::result::Result<T, ComputeError>;

/// Result type alias for simulation operations.
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
