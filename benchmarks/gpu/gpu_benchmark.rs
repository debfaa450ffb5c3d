//! GPU vs CPU N-body benchmark
//!
//! Integrates a ring of bodies around a heavy centre with:
//! - the CPU reference integrator
//! - the leap-frog kernel on the GPU
//!
//! Run with: cargo run --release --bin gpu_benchmark

use gpuhelper::gpu::shaders::LEAP_FROG_MAX_BODIES;
use gpuhelper::gpu::{ComputeContext, ContextConfig};
use gpuhelper::simulation::integrator::max_position_deviation;
use gpuhelper::simulation::{BodySpec, KernelSource, Physics, Scenario, run_on_cpu, run_on_gpu};
use std::time::Instant;

const RING_BODIES: usize = LEAP_FROG_MAX_BODIES - 1;
const CENTRAL_MASS: f32 = 1000.0;
const RING_RADIUS: f32 = 50.0;
const DT: f32 = 0.005;
const T_MAX: f32 = 20.0;

fn create_ring_scenario() -> Scenario {
    let mut seed: u64 = 12345;
    let mut jitter = || {
        // LCG random number generator
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((seed >> 33) as f32) / (u32::MAX as f32) - 0.25
    };

    let physics = Physics::new();
    let mut bodies = vec![BodySpec {
        name: "centre".to_string(),
        position: [0.0; 3],
        velocity: [0.0; 3],
        mass: CENTRAL_MASS,
    }];

    for i in 0..RING_BODIES {
        let angle = i as f32 / RING_BODIES as f32 * std::f32::consts::TAU;
        let radius = RING_RADIUS + jitter();
        let speed = (physics.gravitational_constant * CENTRAL_MASS / radius).sqrt();
        bodies.push(BodySpec {
            name: format!("ring-{i}"),
            position: [radius * angle.cos(), radius * angle.sin(), jitter()],
            velocity: [-speed * angle.sin(), speed * angle.cos(), 0.0],
            mass: 0.1,
        });
    }

    Scenario {
        name: Some("ring".to_string()),
        dt: DT,
        t_max: T_MAX,
        physics,
        bodies,
    }
}

fn main() {
    env_logger::init();

    println!("=== GPU vs CPU N-body Benchmark ===\n");
    println!("Configuration:");
    println!("  Bodies:    {}", RING_BODIES + 1);
    println!("  Time step: {}", DT);
    println!("  Duration:  {}", T_MAX);

    let scenario = create_ring_scenario();
    let steps = scenario.steps();
    let interactions = steps as f64 * ((RING_BODIES + 1) * RING_BODIES) as f64;
    println!("  Steps:     {}\n", steps);

    println!("Running CPU benchmark...");
    let start = Instant::now();
    let cpu_output = run_on_cpu(&scenario).expect("CPU integration failed");
    let cpu_time = start.elapsed().as_secs_f64();
    println!("  Time: {:.3} s", cpu_time);
    println!("  Throughput: {:.0} interactions/sec\n", interactions / cpu_time);

    println!("Running GPU benchmark...");
    let ctx = match ComputeContext::new(&ContextConfig::new().with_label("benchmark")) {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("  Skipped: {} ({})", e, e.status_name());
            return;
        }
    };
    println!("  GPU: {} ({})", ctx.info().name, ctx.info().backend);

    // Warmup compiles the pipeline once before timing
    let warmup = Scenario {
        t_max: DT,
        ..scenario.clone()
    };
    run_on_gpu(&ctx, &warmup, &KernelSource::Embedded).expect("GPU warmup failed");

    let start = Instant::now();
    let gpu_output =
        run_on_gpu(&ctx, &scenario, &KernelSource::Embedded).expect("GPU integration failed");
    let gpu_time = start.elapsed().as_secs_f64();
    println!("  Time (build, transfer, compute, readback): {:.3} s", gpu_time);
    println!("  Throughput: {:.0} interactions/sec\n", interactions / gpu_time);

    let deviation = max_position_deviation(&cpu_output, &gpu_output);
    println!("Largest position deviation GPU vs CPU: {:.2e}\n", deviation);

    println!("=== Summary ===");
    println!("CPU: {:>10.3} s (baseline)", cpu_time);
    println!("GPU: {:>10.3} s ({:.1}x)", gpu_time, cpu_time / gpu_time);

    ctx.release().expect("Failed to release compute context");
}
