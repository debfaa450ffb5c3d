//! Three-body demo: integrates sun, earth and moon with a leap-frog kernel on the GPU.

use std::path::PathBuf;

use gpuhelper::errors::SimulationResult;
use gpuhelper::gpu::{ComputeContext, ContextConfig, list_devices};
use gpuhelper::simulation::integrator::max_position_deviation;
use gpuhelper::simulation::{Body, KernelSource, Scenario, run_on_cpu, run_on_gpu};
use log::error;

#[derive(Debug, Default)]
struct Options {
    scenario: Option<PathBuf>,
    kernel: Option<PathBuf>,
    cpu: bool,
    compare: bool,
    list_devices: bool,
    help: bool,
}

fn main() {
    env_logger::init();

    let options = match parse_args(std::env::args().skip(1)) {
        Some(options) => options,
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    if options.help {
        print_usage();
        return;
    }

    if let Err(e) = run(options) {
        error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Options> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scenario" => options.scenario = Some(PathBuf::from(args.next()?)),
            "--kernel" => options.kernel = Some(PathBuf::from(args.next()?)),
            "--cpu" => options.cpu = true,
            "--compare" => options.compare = true,
            "--list-devices" => options.list_devices = true,
            "--help" | "-h" => options.help = true,
            _ => return None,
        }
    }
    Some(options)
}

fn run(options: Options) -> SimulationResult<()> {
    if options.list_devices {
        let devices = list_devices(wgpu::Backends::all());
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    let scenario = match &options.scenario {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::three_body(),
    };
    let source = options
        .kernel
        .clone()
        .map(KernelSource::File)
        .unwrap_or_default();

    let universe = scenario.universe();
    println!(
        "Size of universe: {} bytes",
        std::mem::size_of_val(&universe[..])
    );
    print_positions(&scenario, &universe, |body| body.previous);

    if options.cpu {
        let output = run_on_cpu(&scenario)?;
        print_positions(&scenario, &output, |body| body.position);
        return Ok(());
    }

    let ctx = ComputeContext::new(&ContextConfig::new().with_label("three-body"))?;
    let output = run_on_gpu(&ctx, &scenario, &source)?;
    ctx.release()?;

    println!(
        "{} Bytes of data read from graphics card",
        std::mem::size_of_val(&output[..])
    );
    print_positions(&scenario, &output, |body| body.position);

    if options.compare {
        let reference = run_on_cpu(&scenario)?;
        println!(
            "Largest deviation from CPU reference: {:9.6}",
            max_position_deviation(&output, &reference)
        );
    }
    Ok(())
}

fn print_positions(scenario: &Scenario, universe: &[Body], position: impl Fn(&Body) -> [f32; 3]) {
    let width = scenario.body_names().map(str::len).max().unwrap_or(0);
    for (name, body) in scenario.body_names().zip(universe) {
        let [x, y, z] = position(body);
        let label = format!("{name}:");
        println!(
            "Position of {:<width$} {:9.6}, {:9.6}, {:9.6}",
            label,
            x,
            y,
            z,
            width = width + 1
        );
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  cargo run --bin three_body --release                          # Sun, earth and moon on the GPU");
    println!("  cargo run --bin three_body --release -- --scenario <file>     # Load a JSON scenario");
    println!("  cargo run --bin three_body --release -- --kernel <file.wgsl>  # Use a custom leap_frog kernel");
    println!("  cargo run --bin three_body --release -- --cpu                 # Use the CPU reference integrator");
    println!("  cargo run --bin three_body --release -- --compare             # Check the GPU against the CPU");
    println!("  cargo run --bin three_body --release -- --list-devices        # Show available devices");
}
