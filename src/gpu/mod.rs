//! Thin convenience layer over the GPU compute driver.
//!
//! The pieces compose in a fixed order: open a [`ComputeContext`], build a
//! [`Program`] and a [`Kernel`] from it, move data in with
//! [`DeviceBuffer::write`], dispatch with [`Kernel::enqueue`], wait with
//! [`ComputeContext::finish`], and move data out with [`DeviceBuffer::read`].
//!
//! # Usage
//!
//! ```ignore
//! use gpuhelper::gpu::{ComputeContext, ContextConfig, Defines, DeviceBuffer, Kernel, KernelArgs, Program};
//!
//! let ctx = ComputeContext::new(&ContextConfig::new())?;
//! let program = Program::from_file(&ctx, "source.wgsl", Defines::new())?;
//! let kernel = Kernel::new(&ctx, &program, "my_kernel")?;
//!
//! let data = vec![0.0f32; 1024];
//! let buffer = DeviceBuffer::create(&ctx, std::mem::size_of_val(&data[..]) as u64)?;
//! buffer.write(&ctx, &data)?;
//! kernel.enqueue(&ctx, &KernelArgs::new().arg(0, &buffer), data.len())?;
//! ctx.finish()?;
//! let result: Vec<f32> = buffer.read_vec(&ctx, data.len())?;
//! ctx.release()?;
//! ```

pub mod buffer;
pub mod context;
pub mod kernel;
pub mod platform;
pub mod program;
pub mod reflect;
pub mod shaders;

pub use buffer::{BufferKind, DeviceBuffer};
pub use context::{ComputeContext, ContextConfig};
pub use kernel::{Kernel, KernelArgs};
pub use platform::{DeviceInfo, DeviceKind, list_devices};
pub use program::{CompileMessage, Defines, MessageLevel, Program, load_source};
pub use reflect::{ProgramLayout, WorkgroupSize};
