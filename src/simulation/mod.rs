//! Gravitational N-body simulation on top of the compute helper.
//!
//! A [`Scenario`] describes the initial bodies; [`run_on_gpu`] integrates it
//! with the leap-frog kernel and [`run_on_cpu`] with the reference integrator.

pub mod body;
pub mod integrator;
pub mod runner;
pub mod scenario;

pub use body::{Body, SimParams};
pub use runner::{KernelSource, read_universe, run_on_cpu, run_on_gpu};
pub use scenario::{BodySpec, Physics, Scenario};
