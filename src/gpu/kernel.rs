//! Kernels: compiled entry points, their arguments, and range dispatch.

use std::collections::BTreeMap;

use log::debug;

use crate::errors::{ComputeError, ComputeResult};
use crate::gpu::buffer::DeviceBuffer;
use crate::gpu::context::ComputeContext;
use crate::gpu::program::Program;
use crate::gpu::reflect::WorkgroupSize;

/// Buffers bound to a kernel, keyed by binding index in bind group 0.
#[derive(Debug, Default)]
pub struct KernelArgs<'a> {
    buffers: BTreeMap<u32, &'a DeviceBuffer>,
}

impl<'a> KernelArgs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `buffer` at `index`, replacing any earlier binding there.
    pub fn arg(mut self, index: u32, buffer: &'a DeviceBuffer) -> Self {
        self.set_arg(index, buffer);
        self
    }

    pub fn set_arg(&mut self, index: u32, buffer: &'a DeviceBuffer) {
        self.buffers.insert(index, buffer);
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// A compute entry point of a [`Program`], ready to be dispatched.
pub struct Kernel {
    name: String,
    pipeline: wgpu::ComputePipeline,
    workgroup_size: u32,
}

impl Kernel {
    /// Creates the kernel for entry point `name` in `program`.
    ///
    /// The workgroup size is read from the entry point's `@workgroup_size`.
    /// When that names an overridable constant, a define of the same name
    /// sets it; otherwise the constant's default applies.
    pub fn new(ctx: &ComputeContext, program: &Program, name: &str) -> ComputeResult<Self> {
        let declared = program.layout().workgroup_size(name).ok_or_else(|| {
            ComputeError::InvalidKernelName {
                name: name.to_string(),
                message: format!("{} has no compute entry point {name}", program.label()),
            }
        })?;
        let workgroup_size = match declared {
            WorkgroupSize::Fixed(size) => *size,
            WorkgroupSize::Override { name: constant, default } => {
                match program.defines().get(constant) {
                    Some(size) => workgroup_size_from_define(constant, size, ctx.limits())?,
                    None => default.ok_or_else(|| ComputeError::InvalidBuildOptions {
                        options: String::new(),
                        reason: format!("{constant} has no default; pass -D {constant}=N"),
                    })?,
                }
            }
        };

        let constants = program.defines().to_constants();
        let (pipeline, error) = ctx.capture(|device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: None,
                module: program.module(),
                entry_point: Some(name),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::InvalidKernelName {
                name: name.to_string(),
                message: e.to_string(),
            });
        }
        debug!(
            "Kernel {} created from {} (workgroup size {})",
            name,
            program.label(),
            workgroup_size
        );

        Ok(Self {
            name: name.to_string(),
            pipeline,
            workgroup_size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    /// Number of workgroups needed to cover `global_work_size` work items.
    pub fn workgroup_count(&self, global_work_size: usize) -> usize {
        global_work_size.div_ceil(self.workgroup_size as usize)
    }

    /// Submits one dispatch covering `global_work_size` work items.
    ///
    /// Returns once the work is queued; call [`ComputeContext::finish`] to wait
    /// for it.
    pub fn enqueue(
        &self,
        ctx: &ComputeContext,
        args: &KernelArgs<'_>,
        global_work_size: usize,
    ) -> ComputeResult<()> {
        let max_groups = ctx.limits().max_compute_workgroups_per_dimension;
        let groups = self.workgroup_count(global_work_size);
        if global_work_size == 0 {
            return Err(ComputeError::InvalidGlobalWorkSize {
                size: global_work_size,
                reason: "must be greater than 0".to_string(),
            });
        }
        let groups = u32::try_from(groups)
            .ok()
            .filter(|&groups| groups <= max_groups)
            .ok_or_else(|| ComputeError::InvalidGlobalWorkSize {
                size: global_work_size,
                reason: format!(
                    "needs {} workgroups of {}, device allows {}",
                    groups, self.workgroup_size, max_groups
                ),
            })?;

        let entries: Vec<wgpu::BindGroupEntry<'_>> = args
            .buffers
            .iter()
            .map(|(&binding, buffer)| wgpu::BindGroupEntry {
                binding,
                resource: buffer.raw().as_entire_binding(),
            })
            .collect();

        let (bind_group, error) = ctx.capture(|device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.name.as_str()),
                layout: &self.pipeline.get_bind_group_layout(0),
                entries: &entries,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::InvalidKernelArgs {
                name: self.name.clone(),
                message: e.to_string(),
            });
        }

        let ((), error) = ctx.capture(|device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(self.name.as_str()),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(self.name.as_str()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(groups, 1, 1);
            }
            ctx.queue().submit(Some(encoder.finish()));
        });
        if let Some(e) = error {
            return Err(ComputeError::InvalidOperation {
                message: e.to_string(),
            });
        }
        debug!(
            "Enqueued {} with {} work items in {} workgroup(s)",
            self.name, global_work_size, groups
        );
        Ok(())
    }
}

fn workgroup_size_from_define(name: &str, size: f64, limits: wgpu::Limits) -> ComputeResult<u32> {
    let max = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_invocations_per_workgroup);
    if size.fract() != 0.0 || size < 1.0 || size > f64::from(max) {
        return Err(ComputeError::InvalidBuildOptions {
            options: format!("-D {name}={size}"),
            reason: format!("workgroup size must be a whole number between 1 and {max}"),
        });
    }
    Ok(size as u32)
}
