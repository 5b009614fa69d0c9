mod gpu_context;
#[cfg(test)]
mod tests;

pub use gpu_context::{GpuContext, GpuPipeline};

use crate::config::{BackendPreference, EqualizeConfig};
use crate::prelude::*;

/// Processing context that owns the compute devices and cached pipelines.
///
/// This is the main entry point for equalization; see
/// [`HistogramEqualization`](crate::ops::HistogramEqualization).
#[derive(Debug)]
pub struct ProcessingContext {
    cpu: CpuBackend,
    gpu_context: Option<GpuContext>,
}

impl ProcessingContext {
    /// Creates a new ProcessingContext, attempting to initialize GPU.
    /// Falls back to CPU-only if GPU is unavailable.
    pub fn new() -> Self {
        match Gpu::new() {
            Ok(gpu) => Self::with_gpu(GpuContext::new(gpu)),
            Err(e) => {
                tracing::warn!("GPU initialization failed, falling back to CPU: {}", e);
                Self::cpu_only()
            }
        }
    }

    /// Creates a CPU-only ProcessingContext (no GPU).
    pub fn cpu_only() -> Self {
        Self {
            cpu: CpuBackend::new(),
            gpu_context: None,
        }
    }

    /// Creates a ProcessingContext with the given GPU context.
    pub fn with_gpu(gpu_context: GpuContext) -> Self {
        Self {
            cpu: CpuBackend::new(),
            gpu_context: Some(gpu_context),
        }
    }

    /// Builds a context as described by `config`.
    ///
    /// `Auto` falls back to the CPU when the requested device cannot be
    /// opened; `Gpu` turns that into an error.
    pub fn from_config(config: &EqualizeConfig) -> Result<Self> {
        let cpu = match config.threads {
            Some(threads) => CpuBackend::with_threads(threads)?,
            None => CpuBackend::new(),
        };

        if config.backend == BackendPreference::Cpu {
            return Ok(Self {
                cpu,
                gpu_context: None,
            });
        }

        let gpu = match (config.platform, config.device) {
            (None, None) => Gpu::new(),
            (platform, device) => Gpu::select(platform.unwrap_or(0), device.unwrap_or(0)),
        };

        let gpu_context = match gpu {
            Ok(gpu) => Some(GpuContext::with_kernels(gpu, config.kernel_source())),
            Err(e) if config.backend == BackendPreference::Auto => {
                tracing::warn!("GPU initialization failed, falling back to CPU: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self { cpu, gpu_context })
    }

    /// Returns true if GPU is available.
    pub fn has_gpu(&self) -> bool {
        self.gpu_context.is_some()
    }

    /// Returns a reference to the GPU context if available.
    pub fn gpu(&self) -> Option<&Gpu> {
        self.gpu_context.as_ref().map(|p| p.gpu())
    }

    /// Returns a mutable reference to the GPU processing context.
    /// Returns None if no GPU is available.
    pub fn gpu_context(&mut self) -> Option<&mut GpuContext> {
        self.gpu_context.as_mut()
    }

    pub fn cpu(&self) -> &CpuBackend {
        &self.cpu
    }

    /// "<platform>, <device>" of the device runs will use.
    pub fn device_description(&self) -> String {
        match self.gpu() {
            Some(gpu) => gpu.to_string(),
            None => format!("Host, {}", self.cpu.name()),
        }
    }
}

impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new()
    }
}
