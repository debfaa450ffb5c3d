//! Errors raised while preparing or running a simulation.

use std::path::PathBuf;

use thiserror::Error;

use super::ComputeError;

/// Errors that can occur while loading a scenario or running it.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("Couldn't read scenario {path}: {source}")]
    ScenarioIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario JSON: {0}")]
    ScenarioFormat(#[from] serde_json::Error),

    #[error("The universe must contain at least one body")]
    EmptyUniverse,

    #[error("The time step must be finite and greater than 0, got {dt}")]
    InvalidTimeStep { dt: f32 },

    #[error("The simulated time must be finite and non-negative, got {t_max}")]
    InvalidDuration { t_max: f32 },

    #[error("Body {name} must have a finite positive mass, got {mass}")]
    InvalidMass { name: String, mass: f32 },

    #[error("Body {name} has a non-finite {field}: {value:?}")]
    InvalidBody {
        name: String,
        field: &'static str,
        value: [f32; 3],
    },

    #[error("{count} bodies exceed the {max} a single workgroup can integrate")]
    TooManyBodies { count: usize, max: usize },

    #[error("Host buffer holds {actual} bytes but the device buffer holds {expected}")]
    BufferSizeMismatch { expected: u64, actual: u64 },
}
