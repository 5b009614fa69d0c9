// Error handling
pub use crate::common::{BuildDiagnostics, Error, Result};

// Bins and host-side buffers
pub use crate::bins::{BinCount, bin_index};
pub use crate::histogram::{CumulativeHistogram, Histogram, LookupTable};

// Image types
pub use crate::image::{ChannelLayout, IntensityPlane, PlaneDesc, Raster, SourceImage};

// Pipeline and backends
pub use crate::cpu::CpuBackend;
pub use crate::pipeline::{
    BufferName, ComputeBackend, EqualizePipeline, Equalized, PipelineTimings, Stage, StageTiming,
};

// Context and configuration
pub use crate::config::{BackendPreference, EqualizeConfig};
pub use crate::processing_context::{GpuContext, GpuPipeline, ProcessingContext};

// Operations
pub use crate::ops::{Backend, HistogramEqualization, select_backend};

// GPU
pub use crate::gpu::{
    DeviceInfo, Gpu, GpuBackend, GpuEqualizePipeline, KernelSource, PlatformInfo, list_platforms,
};
