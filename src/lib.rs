//! Convenience layer over a GPU compute driver.
//!
//! The [`gpu`] module wraps device discovery, context and queue creation,
//! buffer allocation, blocking transfers, program compilation and kernel
//! dispatch. The [`simulation`] module uses it to integrate a small
//! gravitating system with a leap-frog kernel.

pub mod errors;
pub mod gpu;
pub mod simulation;

pub use errors::{ComputeError, ComputeResult, SimulationError, SimulationResult};
pub use gpu::{ComputeContext, ContextConfig, DeviceBuffer, Kernel, KernelArgs, Program};
pub use simulation::{Body, Scenario};
