//! The compute context: one adapter, one device, one queue.

use log::{debug, info};
use pollster::FutureExt;

use crate::errors::{ComputeError, ComputeResult};
use crate::gpu::platform::{self, DeviceInfo, DeviceKind};

/// Options used when opening a [`ComputeContext`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    device_kind: DeviceKind,
    power_preference: wgpu::PowerPreference,
    backends: wgpu::Backends,
    label: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self {
            device_kind: DeviceKind::Gpu,
            power_preference: wgpu::PowerPreference::HighPerformance,
            backends: wgpu::Backends::all(),
            label: None,
        }
    }

    pub fn with_device_kind(mut self, device_kind: DeviceKind) -> Self {
        self.device_kind = device_kind;
        self
    }

    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    pub fn with_backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.device_kind
    }
}

/// An open device and its command queue.
///
/// Every buffer, program and kernel is created against one context and must not
/// outlive it. The context is torn down with [`ComputeContext::release`] or by
/// dropping it.
pub struct ComputeContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: DeviceInfo,
}

impl ComputeContext {
    /// Discovers a device matching `config` and opens a context and queue on it.
    pub fn new(config: &ContextConfig) -> ComputeResult<Self> {
        let instance = platform::create_instance(config.backends);
        let (adapter, available) = platform::select_adapter(
            &instance,
            config.backends,
            config.device_kind,
            config.power_preference,
        );
        let adapter = adapter.ok_or_else(|| ComputeError::DeviceNotFound {
            requested: config.device_kind.as_str().to_string(),
            available,
        })?;

        let info = DeviceInfo::from(&adapter.get_info());
        info!("Device: {} ({}, {})", info.name, info.device_type, info.backend);

        // Ask for what the adapter offers so large buffers are not capped by defaults.
        let required_limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: config.label.as_deref(),
                    required_limits,
                    ..Default::default()
                },
                None,
            )
            .block_on()
            .map_err(|e| ComputeError::DeviceNotAvailable {
                message: e.to_string(),
            })?;
        info!("Command queue created");

        Ok(Self {
            device,
            queue,
            info,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Blocks until every operation submitted to the queue has completed.
    pub fn finish(&self) -> ComputeResult<()> {
        if !self.device.poll(wgpu::Maintain::Wait).is_queue_empty() {
            return Err(ComputeError::InvalidOperation {
                message: "queue still busy after a blocking wait".to_string(),
            });
        }
        debug!("Queue drained");
        Ok(())
    }

    /// Runs `f` inside validation and out-of-memory error scopes and returns
    /// the first error the driver raised, if any.
    pub(crate) fn capture<T>(
        &self,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = self.device.pop_error_scope().block_on();
        let out_of_memory = self.device.pop_error_scope().block_on();
        (value, validation.or(out_of_memory))
    }

    /// Waits for outstanding work and releases the device and queue.
    pub fn release(self) -> ComputeResult<()> {
        self.finish()?;
        info!("Released compute context on {}", self.info.name);
        Ok(())
    }
}
