//! Platform and device discovery.

use serde::Serialize;

/// Which kind of device a context should be opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    /// Discrete or integrated GPUs only.
    #[default]
    Gpu,
    /// Any adapter the driver exposes, including software rasterizers.
    Any,
}

impl DeviceKind {
    pub fn accepts(&self, device_type: wgpu::DeviceType) -> bool {
        match self {
            DeviceKind::Gpu => matches!(
                device_type,
                wgpu::DeviceType::DiscreteGpu
                    | wgpu::DeviceType::IntegratedGpu
                    | wgpu::DeviceType::VirtualGpu
            ),
            DeviceKind::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Gpu => "GPU",
            DeviceKind::Any => "compute",
        }
    }
}

/// Description of one adapter exposed by the driver.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: String,
    pub backend: String,
    pub driver: String,
    pub driver_info: String,
}

impl From<&wgpu::AdapterInfo> for DeviceInfo {
    fn from(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            vendor: info.vendor,
            device: info.device,
            device_type: format!("{:?}", info.device_type),
            backend: format!("{:?}", info.backend),
            driver: info.driver.clone(),
            driver_info: info.driver_info.clone(),
        }
    }
}

/// Lists every adapter reachable through the given backends.
pub fn list_devices(backends: wgpu::Backends) -> Vec<DeviceInfo> {
    let instance = create_instance(backends);
    instance
        .enumerate_adapters(backends)
        .iter()
        .map(|adapter| DeviceInfo::from(&adapter.get_info()))
        .collect()
}

pub(crate) fn create_instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Picks an adapter of the requested kind.
///
/// Discrete GPUs are preferred under high-performance power preference and
/// integrated GPUs under low-power preference; ties keep enumeration order.
/// Returns the number of adapters seen alongside the choice.
pub(crate) fn select_adapter(
    instance: &wgpu::Instance,
    backends: wgpu::Backends,
    kind: DeviceKind,
    power_preference: wgpu::PowerPreference,
) -> (Option<wgpu::Adapter>, usize) {
    let adapters = instance.enumerate_adapters(backends);
    let available = adapters.len();

    let chosen = adapters
        .into_iter()
        .filter(|adapter| kind.accepts(adapter.get_info().device_type))
        .enumerate()
        .min_by_key(|(position, adapter)| {
            (
                rank(adapter.get_info().device_type, power_preference),
                *position,
            )
        })
        .map(|(_, adapter)| adapter);

    (chosen, available)
}

fn rank(device_type: wgpu::DeviceType, power_preference: wgpu::PowerPreference) -> u8 {
    use wgpu::DeviceType::*;
    match (power_preference, device_type) {
        (wgpu::PowerPreference::LowPower, IntegratedGpu) => 0,
        (wgpu::PowerPreference::LowPower, DiscreteGpu) => 1,
        (_, DiscreteGpu) => 0,
        (_, IntegratedGpu) => 1,
        (_, VirtualGpu) => 2,
        (_, Cpu) => 3,
        (_, Other) => 4,
    }
}
