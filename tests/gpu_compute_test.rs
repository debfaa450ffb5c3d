//! GPU tests for the compute helper, checked against host-side expectations.
//!
//! Every test opens its own context and returns early, with a note on stderr,
//! when the machine exposes no adapter at all. Set `GPUHELPER_REQUIRE_GPU=1`
//! to turn a missing adapter into a failure instead.

use gpuhelper::errors::{ComputeError, SimulationError};
use gpuhelper::gpu::shaders::{LEAP_FROG_ENTRY, LEAP_FROG_MAX_BODIES, LEAP_FROG_WGSL};
use gpuhelper::gpu::{
    ComputeContext, ContextConfig, Defines, DeviceBuffer, DeviceKind, Kernel, KernelArgs,
    MessageLevel, Program,
};
use gpuhelper::simulation::integrator::max_position_deviation;
use gpuhelper::simulation::{
    Body, BodySpec, KernelSource, Scenario, read_universe, run_on_cpu, run_on_gpu,
};

const TOLERANCE: f32 = 1e-2;

/// Path of the scaling kernel used by these tests.
const SCALE_SHADER: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/shaders/scale.wgsl");

/// Environment variable that makes a missing adapter fail the GPU tests.
const REQUIRE_GPU: &str = "GPUHELPER_REQUIRE_GPU";

fn gpu_required() -> bool {
    std::env::var(REQUIRE_GPU).is_ok_and(|value| !value.is_empty() && value != "0")
}

fn open_context() -> Option<ComputeContext> {
    match ComputeContext::new(&ContextConfig::new().with_device_kind(DeviceKind::Any)) {
        Ok(ctx) => Some(ctx),
        Err(e) if gpu_required() => panic!("{REQUIRE_GPU} is set but no GPU is usable: {e}"),
        Err(e) => {
            eprintln!(
                "SKIPPED GPU test: {} ({}); set {REQUIRE_GPU}=1 to fail instead",
                e,
                e.status_name()
            );
            None
        }
    }
}

fn short_scenario() -> Scenario {
    Scenario {
        t_max: 2.0,
        ..Scenario::three_body()
    }
}

#[test]
fn test_write_then_read_returns_the_same_bytes() {
    let Some(ctx) = open_context() else { return };

    let data: Vec<f32> = (0..100).map(|i| i as f32 * 0.5).collect();
    let buffer = DeviceBuffer::create(&ctx, 400).unwrap();
    buffer.write(&ctx, &data).unwrap();
    ctx.finish().unwrap();

    let back: Vec<f32> = buffer.read_vec(&ctx, data.len()).unwrap();
    assert_eq!(back, data);

    // A shorter read takes the prefix.
    let prefix: Vec<f32> = buffer.read_vec(&ctx, 10).unwrap();
    assert_eq!(prefix, &data[..10]);
}

#[test]
fn test_unaligned_transfer_sizes() {
    let Some(ctx) = open_context() else { return };

    let data: Vec<u8> = (0..7).collect();
    let buffer = DeviceBuffer::create(&ctx, 7).unwrap();
    assert_eq!(buffer.size(), 7);
    buffer.write(&ctx, &data).unwrap();

    let back: Vec<u8> = buffer.read_vec(&ctx, 7).unwrap();
    assert_eq!(back, data);
}

#[test]
fn test_oversized_transfers_are_rejected() {
    let Some(ctx) = open_context() else { return };

    let buffer = DeviceBuffer::create(&ctx, 16).unwrap();
    let result = buffer.write(&ctx, &[0.0f32; 5]);
    assert!(matches!(result, Err(ComputeError::InvalidValue { .. })));

    let mut too_big = [0.0f32; 8];
    let result = buffer.read(&ctx, &mut too_big);
    assert!(matches!(result, Err(ComputeError::InvalidValue { .. })));
}

#[test]
fn test_empty_transfers_are_rejected() {
    let Some(ctx) = open_context() else { return };

    let buffer = DeviceBuffer::create(&ctx, 16).unwrap();
    let result = buffer.read_vec::<f32>(&ctx, 0);
    assert!(matches!(result, Err(ComputeError::InvalidValue { .. })));

    let result = buffer.write::<f32>(&ctx, &[]);
    assert!(matches!(result, Err(ComputeError::InvalidValue { .. })));

    // The buffer is still usable afterwards.
    buffer.write(&ctx, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(buffer.read_vec::<f32>(&ctx, 4).unwrap(), [1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_zero_sized_buffer_is_rejected() {
    let Some(ctx) = open_context() else { return };

    let result = DeviceBuffer::create(&ctx, 0);
    assert!(matches!(result, Err(ComputeError::InvalidBufferSize { .. })));
}

#[test]
fn test_scale_kernel_from_file_with_define() {
    let Some(ctx) = open_context() else { return };

    let defines = Defines::parse("-D FACTOR=3").unwrap();
    let program = Program::from_file(&ctx, SCALE_SHADER, defines).unwrap();
    let kernel = Kernel::new(&ctx, &program, "scale").unwrap();
    assert_eq!(kernel.workgroup_size(), 64);

    // 100 items need two workgroups of 64.
    let data: Vec<f32> = (0..100).map(|i| i as f32).collect();
    assert_eq!(kernel.workgroup_count(data.len()), 2);

    let buffer = DeviceBuffer::create(&ctx, (data.len() * 4) as u64).unwrap();
    buffer.write(&ctx, &data).unwrap();
    kernel
        .enqueue(&ctx, &KernelArgs::new().arg(0, &buffer), data.len())
        .unwrap();
    ctx.finish().unwrap();

    let result: Vec<f32> = buffer.read_vec(&ctx, data.len()).unwrap();
    for (i, value) in result.iter().enumerate() {
        assert_eq!(*value, i as f32 * 3.0, "mismatch at index {i}");
    }
}

#[test]
fn test_workgroup_size_define_resizes_the_dispatch() {
    let Some(ctx) = open_context() else { return };

    let defines = Defines::parse("-D WORKGROUP_SIZE=128 -D FACTOR=3").unwrap();
    let program = Program::from_file(&ctx, SCALE_SHADER, defines).unwrap();
    let kernel = Kernel::new(&ctx, &program, "scale").unwrap();
    assert_eq!(kernel.workgroup_size(), 128);

    // 100 items fit in one workgroup of 128.
    let data: Vec<f32> = (0..100).map(|i| i as f32).collect();
    assert_eq!(kernel.workgroup_count(data.len()), 1);

    let buffer = DeviceBuffer::create(&ctx, (data.len() * 4) as u64).unwrap();
    buffer.write(&ctx, &data).unwrap();
    kernel
        .enqueue(&ctx, &KernelArgs::new().arg(0, &buffer), data.len())
        .unwrap();
    ctx.finish().unwrap();

    let result: Vec<f32> = buffer.read_vec(&ctx, data.len()).unwrap();
    for (i, value) in result.iter().enumerate() {
        assert_eq!(*value, i as f32 * 3.0, "mismatch at index {i}");
    }
}

#[test]
fn test_small_workgroup_size_covers_every_item() {
    let Some(ctx) = open_context() else { return };

    let defines = Defines::parse("-D WORKGROUP_SIZE=16 -D FACTOR=0.5").unwrap();
    let program = Program::from_file(&ctx, SCALE_SHADER, defines).unwrap();
    let kernel = Kernel::new(&ctx, &program, "scale").unwrap();
    assert_eq!(kernel.workgroup_count(100), 7);

    let data: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let buffer = DeviceBuffer::create(&ctx, (data.len() * 4) as u64).unwrap();
    buffer.write(&ctx, &data).unwrap();
    kernel
        .enqueue(&ctx, &KernelArgs::new().arg(0, &buffer), data.len())
        .unwrap();
    ctx.finish().unwrap();

    let result: Vec<f32> = buffer.read_vec(&ctx, data.len()).unwrap();
    for (i, value) in result.iter().enumerate() {
        assert_eq!(*value, i as f32 * 0.5, "mismatch at index {i}");
    }
}

#[test]
fn test_define_without_matching_override_is_rejected() {
    let Some(ctx) = open_context() else { return };

    // leap_frog has a literal @workgroup_size and no WORKGROUP_SIZE override.
    let defines = Defines::parse("-D WORKGROUP_SIZE=128").unwrap();
    let result = Program::from_source(&ctx, "leap_frog", LEAP_FROG_WGSL, defines);
    assert!(matches!(
        result,
        Err(ComputeError::InvalidBuildOptions { .. })
    ));

    let defines = Defines::parse("-D FACTR=3").unwrap();
    let result = Program::from_file(&ctx, SCALE_SHADER, defines);
    assert!(matches!(
        result,
        Err(ComputeError::InvalidBuildOptions { .. })
    ));
}

#[test]
fn test_missing_source_file() {
    let Some(ctx) = open_context() else { return };

    let result = Program::from_file(&ctx, "/definitely/not/here.wgsl", Defines::new());
    assert!(matches!(result, Err(ComputeError::SourceUnavailable { .. })));
}

#[test]
fn test_build_failure_reports_log() {
    let Some(ctx) = open_context() else { return };

    let result = Program::from_source(&ctx, "broken", "fn main( {", Defines::new());
    match result {
        Err(ComputeError::BuildProgramFailure { label, log }) => {
            assert_eq!(label, "broken");
            assert!(!log.is_empty());
        }
        other => panic!("expected BuildProgramFailure, got {other:?}"),
    }
}

#[test]
fn test_valid_program_has_no_errors_in_log() {
    let Some(ctx) = open_context() else { return };

    let program = Program::from_source(&ctx, "leap_frog", LEAP_FROG_WGSL, Defines::new()).unwrap();
    assert!(
        program
            .messages()
            .iter()
            .all(|m| m.level != MessageLevel::Error)
    );
    assert_eq!(program.label(), "leap_frog");
}

#[test]
fn test_unknown_entry_point() {
    let Some(ctx) = open_context() else { return };

    let program = Program::from_file(&ctx, SCALE_SHADER, Defines::new()).unwrap();
    let result = Kernel::new(&ctx, &program, "does_not_exist");
    assert!(matches!(result, Err(ComputeError::InvalidKernelName { .. })));
}

#[test]
fn test_missing_kernel_argument() {
    let Some(ctx) = open_context() else { return };

    let program = Program::from_file(&ctx, SCALE_SHADER, Defines::new()).unwrap();
    let kernel = Kernel::new(&ctx, &program, "scale").unwrap();
    let result = kernel.enqueue(&ctx, &KernelArgs::new(), 64);
    assert!(matches!(result, Err(ComputeError::InvalidKernelArgs { .. })));
}

#[test]
fn test_zero_global_work_size() {
    let Some(ctx) = open_context() else { return };

    let program = Program::from_file(&ctx, SCALE_SHADER, Defines::new()).unwrap();
    let kernel = Kernel::new(&ctx, &program, "scale").unwrap();
    let buffer = DeviceBuffer::create(&ctx, 256).unwrap();
    let result = kernel.enqueue(&ctx, &KernelArgs::new().arg(0, &buffer), 0);
    assert!(matches!(
        result,
        Err(ComputeError::InvalidGlobalWorkSize { .. })
    ));
}

#[test]
fn test_leap_frog_matches_cpu_reference() {
    let Some(ctx) = open_context() else { return };

    let scenario = short_scenario();
    let gpu = run_on_gpu(&ctx, &scenario, &KernelSource::Embedded).unwrap();
    let cpu = run_on_cpu(&scenario).unwrap();

    let deviation = max_position_deviation(&gpu, &cpu);
    assert!(deviation < TOLERANCE, "GPU deviates from CPU by {deviation}");
    for (g, c) in gpu.iter().zip(&cpu) {
        assert_eq!(g.mass, c.mass);
    }
}

#[test]
fn test_leap_frog_from_file_matches_embedded_kernel() {
    let Some(ctx) = open_context() else { return };

    let path = std::env::temp_dir().join(format!("leap_frog_{}.wgsl", std::process::id()));
    std::fs::write(&path, LEAP_FROG_WGSL).unwrap();

    let scenario = short_scenario();
    let from_file = run_on_gpu(&ctx, &scenario, &KernelSource::File(path.clone())).unwrap();
    let embedded = run_on_gpu(&ctx, &scenario, &KernelSource::Embedded).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(max_position_deviation(&from_file, &embedded), 0.0);
}

#[test]
fn test_zero_steps_leaves_bodies_at_start() {
    let Some(ctx) = open_context() else { return };

    let scenario = Scenario {
        t_max: 0.0,
        ..Scenario::three_body()
    };
    let output = run_on_gpu(&ctx, &scenario, &KernelSource::Embedded).unwrap();
    for (body, spec) in output.iter().zip(&scenario.bodies) {
        assert_eq!(body.position, spec.position);
        assert_eq!(body.velocity, spec.velocity);
    }
}

#[test]
fn test_too_many_bodies() {
    let Some(ctx) = open_context() else { return };

    let mut scenario = Scenario::three_body();
    scenario.bodies = (0..=LEAP_FROG_MAX_BODIES)
        .map(|i| BodySpec {
            name: format!("b{i}"),
            position: [i as f32, 0.0, 0.0],
            velocity: [0.0; 3],
            mass: 1.0,
        })
        .collect();
    let result = run_on_gpu(&ctx, &scenario, &KernelSource::Embedded);
    assert!(matches!(result, Err(SimulationError::TooManyBodies { .. })));
}

#[test]
fn test_read_universe_requires_exact_size() {
    let Some(ctx) = open_context() else { return };

    let buffer = DeviceBuffer::create(&ctx, (3 * Body::SIZE) as u64).unwrap();
    let mut two = vec![Body::default(); 2];
    let result = read_universe(&ctx, &buffer, &mut two);
    assert!(matches!(
        result,
        Err(SimulationError::BufferSizeMismatch {
            expected: 156,
            actual: 104
        })
    ));
}

#[test]
fn test_leap_frog_kernel_creation_and_release() {
    let Some(ctx) = open_context() else { return };

    let program =
        Program::from_source(&ctx, "leap_frog", LEAP_FROG_WGSL, Defines::new()).unwrap();
    let kernel = Kernel::new(&ctx, &program, LEAP_FROG_ENTRY).unwrap();
    assert_eq!(kernel.name(), LEAP_FROG_ENTRY);
    ctx.release().unwrap();
}
