//! Runs a scenario through the compute helper.

use std::path::PathBuf;

use log::info;

use crate::errors::{SimulationError, SimulationResult};
use crate::gpu::shaders::{LEAP_FROG_ENTRY, LEAP_FROG_MAX_BODIES, LEAP_FROG_WGSL};
use crate::gpu::{ComputeContext, DeviceBuffer, Kernel, KernelArgs, Program};
use crate::simulation::body::Body;
use crate::simulation::integrator;
use crate::simulation::scenario::Scenario;

/// Where the leap-frog kernel source comes from.
#[derive(Debug, Clone, Default)]
pub enum KernelSource {
    /// The kernel compiled into the crate.
    #[default]
    Embedded,
    /// A WGSL file exposing the same entry point and bindings.
    File(PathBuf),
}

/// Integrates `scenario` on the device behind `ctx` and returns the final bodies.
pub fn run_on_gpu(
    ctx: &ComputeContext,
    scenario: &Scenario,
    source: &KernelSource,
) -> SimulationResult<Vec<Body>> {
    scenario.validate()?;
    let universe = scenario.universe();
    if universe.len() > LEAP_FROG_MAX_BODIES {
        return Err(SimulationError::TooManyBodies {
            count: universe.len(),
            max: LEAP_FROG_MAX_BODIES,
        });
    }

    let defines = scenario.physics.defines();
    let program = match source {
        KernelSource::Embedded => {
            Program::from_source(ctx, "leap_frog.wgsl", LEAP_FROG_WGSL, defines)?
        }
        KernelSource::File(path) => Program::from_file(ctx, path, defines)?,
    };
    let kernel = Kernel::new(ctx, &program, LEAP_FROG_ENTRY)?;

    let bytes = std::mem::size_of_val(&universe[..]) as u64;
    let bodies = DeviceBuffer::create(ctx, bytes)?;
    bodies.write(ctx, &universe)?;
    ctx.finish()?;

    let params = scenario.params();
    let params_buffer = DeviceBuffer::uniform(ctx, &params)?;
    let args = KernelArgs::new().arg(0, &bodies).arg(1, &params_buffer);

    info!(
        "Integrating {} bodies for {} steps of {}",
        params.count, params.steps, params.dt
    );
    kernel.enqueue(ctx, &args, universe.len())?;
    ctx.finish()?;

    let mut output = vec![Body::default(); universe.len()];
    read_universe(ctx, &bodies, &mut output)?;
    ctx.finish()?;

    bodies.release();
    Ok(output)
}

/// Integrates `scenario` with the CPU reference integrator.
pub fn run_on_cpu(scenario: &Scenario) -> SimulationResult<Vec<Body>> {
    scenario.validate()?;
    let mut universe = scenario.universe();
    integrator::leap_frog(
        &mut universe,
        scenario.dt,
        scenario.steps(),
        &scenario.physics,
    );
    Ok(universe)
}

/// Reads the whole body buffer into `output`, which must match it byte for byte.
pub fn read_universe(
    ctx: &ComputeContext,
    buffer: &DeviceBuffer,
    output: &mut [Body],
) -> SimulationResult<()> {
    let actual = std::mem::size_of_val(output) as u64;
    if actual != buffer.size() {
        return Err(SimulationError::BufferSizeMismatch {
            expected: buffer.size(),
            actual,
        });
    }
    buffer.read(ctx, output)?;
    info!("{} bytes of data read from the device", actual);
    Ok(())
}
