//! Device buffers and blocking transfers between host and device memory.

use std::sync::mpsc;

use bytemuck::Pod;
use log::debug;
use wgpu::util::DeviceExt;

use crate::errors::{ComputeError, ComputeResult};
use crate::gpu::context::ComputeContext;

/// How a buffer is bound when passed to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Read-write storage memory.
    Storage,
    /// Small read-only block of scalar arguments.
    Uniform,
}

/// A region of device memory.
///
/// `size` is the byte count the caller asked for; the underlying allocation is
/// rounded up to the copy alignment.
#[derive(Debug)]
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    size: u64,
    kind: BufferKind,
}

impl DeviceBuffer {
    /// Allocates a read-write buffer of `size` bytes.
    pub fn create(ctx: &ComputeContext, size: u64) -> ComputeResult<Self> {
        let max_size = ctx.limits().max_buffer_size;
        if size == 0 || size > max_size {
            return Err(ComputeError::InvalidBufferSize { size, max_size });
        }

        let (buffer, error) = ctx.capture(|device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Storage Buffer"),
                size: aligned(size),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::MemObjectAllocationFailure {
                size,
                message: e.to_string(),
            });
        }
        debug!("Created storage buffer of {} bytes", size);

        Ok(Self {
            buffer,
            size,
            kind: BufferKind::Storage,
        })
    }

    /// Allocates a uniform buffer holding `value`, used for scalar kernel arguments.
    pub fn uniform<T: Pod>(ctx: &ComputeContext, value: &T) -> ComputeResult<Self> {
        let contents = bytemuck::bytes_of(value);
        if contents.is_empty() {
            return Err(ComputeError::InvalidBufferSize {
                size: 0,
                max_size: u64::from(ctx.limits().max_uniform_buffer_binding_size),
            });
        }

        let (buffer, error) = ctx.capture(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Uniform Buffer"),
                contents,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });
        if let Some(e) = error {
            return Err(ComputeError::MemObjectAllocationFailure {
                size: contents.len() as u64,
                message: e.to_string(),
            });
        }

        Ok(Self {
            buffer,
            size: contents.len() as u64,
            kind: BufferKind::Uniform,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Copies `data` into the start of the buffer and waits for the copy to land.
    pub fn write<T: Pod>(&self, ctx: &ComputeContext, data: &[T]) -> ComputeResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        check_transfer(bytes.len() as u64, self.size)?;
        debug!(
            "Performing blocking write of {} bytes of data from {:p}",
            bytes.len(),
            data.as_ptr()
        );

        // The queue only accepts aligned copies; the tail is padded with zeros.
        let padded;
        let payload = if bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            bytes
        } else {
            let mut tail = bytes.to_vec();
            tail.resize(aligned(bytes.len() as u64) as usize, 0);
            padded = tail;
            &padded[..]
        };

        let ((), error) = ctx.capture(|_| {
            ctx.queue().write_buffer(&self.buffer, 0, payload);
            ctx.queue().submit(std::iter::empty());
        });
        if let Some(e) = error {
            return Err(ComputeError::InvalidOperation {
                message: e.to_string(),
            });
        }
        ctx.finish()
    }

    /// Fills `data` from the start of the buffer, blocking until the bytes arrive.
    pub fn read<T: Pod>(&self, ctx: &ComputeContext, data: &mut [T]) -> ComputeResult<()> {
        let len = std::mem::size_of_val(data) as u64;
        check_transfer(len, self.size)?;
        if self.kind != BufferKind::Storage {
            return Err(ComputeError::InvalidOperation {
                message: "uniform buffers cannot be read back".to_string(),
            });
        }
        debug!(
            "Performing blocking read of {} bytes of data to {:p}",
            len,
            data.as_ptr()
        );

        let copy_size = aligned(len);
        let staging = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: copy_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, copy_size);
        ctx.queue().submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        ctx.finish()?;

        receiver
            .recv()
            .map_err(|e| ComputeError::MapFailure {
                message: e.to_string(),
            })?
            .map_err(|e| ComputeError::MapFailure {
                message: e.to_string(),
            })?;

        {
            let mapped = slice.get_mapped_range();
            bytemuck::cast_slice_mut::<T, u8>(data).copy_from_slice(&mapped[..len as usize]);
        }
        staging.unmap();
        Ok(())
    }

    /// Reads the first `count` elements into a new vector.
    pub fn read_vec<T: Pod>(&self, ctx: &ComputeContext, count: usize) -> ComputeResult<Vec<T>> {
        let mut data = vec![<T as bytemuck::Zeroable>::zeroed(); count];
        self.read(ctx, &mut data)?;
        Ok(data)
    }

    /// Frees the device memory now instead of when the handle is dropped.
    pub fn release(self) {
        self.buffer.destroy();
    }

}

/// A transfer moves at least one byte and fits in the buffer.
fn check_transfer(len: u64, size: u64) -> ComputeResult<()> {
    if len == 0 {
        return Err(ComputeError::InvalidValue {
            message: "transfer of 0 bytes".to_string(),
        });
    }
    if len > size {
        return Err(ComputeError::InvalidValue {
            message: format!("transfer of {} bytes exceeds buffer of {} bytes", len, size),
        });
    }
    Ok(())
}

fn aligned(size: u64) -> u64 {
    size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}
