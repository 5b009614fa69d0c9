mod backend;
mod equalize_pipeline;

use std::fmt;
use std::sync::Arc;

pub use self::backend::{GpuArena, GpuBackend};
pub use self::equalize_pipeline::{GpuEqualizePipeline, KernelSource};

use crate::common::{Error, Result};

/// One adapter as reported by wgpu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub device_type: String,
    pub driver: String,
}

/// Adapters grouped by the wgpu backend that exposes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub index: usize,
    pub name: String,
    pub devices: Vec<DeviceInfo>,
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Platform {}: {}", self.index, self.name)?;
        for device in &self.devices {
            write!(
                f,
                "\n    Device {}: {} ({})",
                device.index, device.name, device.device_type
            )?;
            if !device.driver.is_empty() {
                write!(f, ", driver {}", device.driver)?;
            }
        }
        Ok(())
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

fn platform_name(backend: wgpu::Backend) -> String {
    format!("{:?}", backend)
}

/// Enumerates adapters grouped by backend, in discovery order.
fn enumerate_platforms(instance: &wgpu::Instance) -> Vec<(wgpu::Backend, Vec<wgpu::Adapter>)> {
    let mut platforms: Vec<(wgpu::Backend, Vec<wgpu::Adapter>)> = Vec::new();
    for adapter in instance.enumerate_adapters(wgpu::Backends::all()) {
        let backend = adapter.get_info().backend;
        match platforms.iter_mut().find(|(b, _)| *b == backend) {
            Some((_, adapters)) => adapters.push(adapter),
            None => platforms.push((backend, vec![adapter])),
        }
    }
    platforms
}

/// Lists every platform and its devices.
pub fn list_platforms() -> Vec<PlatformInfo> {
    let instance = create_instance();
    enumerate_platforms(&instance)
        .into_iter()
        .enumerate()
        .map(|(index, (backend, adapters))| PlatformInfo {
            index,
            name: platform_name(backend),
            devices: adapters
                .iter()
                .enumerate()
                .map(|(index, adapter)| {
                    let info = adapter.get_info();
                    DeviceInfo {
                        index,
                        name: info.name,
                        device_type: format!("{:?}", info.device_type),
                        driver: [info.driver, info.driver_info]
                            .into_iter()
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                            .join(" "),
                    }
                })
                .collect(),
        })
        .collect()
}

/// GPU context holding wgpu device and queue for compute operations.
#[derive(Debug, Clone)]
pub struct Gpu {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: wgpu::AdapterInfo,
    timestamps: bool,
}

impl Gpu {
    /// Opens the default high-performance adapter.
    pub fn new() -> Result<Self> {
        let instance = create_instance();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            Error::DeviceUnavailable(format!("failed to find suitable GPU adapter: {}", e))
        })?;

        Self::open(adapter)
    }

    /// Opens device `device` of platform `platform`, as numbered by
    /// [`list_platforms`].
    pub fn select(platform: usize, device: usize) -> Result<Self> {
        let instance = create_instance();
        let mut platforms = enumerate_platforms(&instance);

        if platform >= platforms.len() {
            return Err(Error::DeviceUnavailable(format!(
                "platform {} does not exist, {} found",
                platform,
                platforms.len()
            )));
        }
        let (backend, mut adapters) = platforms.swap_remove(platform);
        if device >= adapters.len() {
            return Err(Error::DeviceUnavailable(format!(
                "device {} does not exist on {}, {} found",
                device,
                platform_name(backend),
                adapters.len()
            )));
        }

        Self::open(adapters.swap_remove(device))
    }

    fn open(adapter: wgpu::Adapter) -> Result<Self> {
        let info = adapter.get_info();
        let required_features = adapter.features() & wgpu::Features::TIMESTAMP_QUERY;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("histeq_device"),
            required_features,
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| Error::DeviceUnavailable(format!("failed to create device: {}", e)))?;

        tracing::info!(
            platform = %platform_name(info.backend),
            device = %info.name,
            timestamps = !required_features.is_empty(),
            "GPU device opened"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info,
            timestamps: !required_features.is_empty(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn platform_name(&self) -> String {
        platform_name(self.info.backend)
    }

    pub fn device_name(&self) -> &str {
        &self.info.name
    }

    /// True when kernel times can be measured with timestamp queries.
    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Blocks until all submitted work has completed.
    pub fn wait(&self, stage: &str) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|e| Error::runtime(stage, "POLL_FAILED", e.to_string()))
    }
}

impl fmt::Display for Gpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.platform_name(), self.device_name())
    }
}
