use std::borrow::Cow;
use std::path::PathBuf;

use crate::common::{BuildDiagnostics, Error, Result};
use crate::gpu::Gpu;
use crate::pipeline::Stage;
use crate::processing_context::GpuPipeline;

const EQUALIZE_SHADER: &str = include_str!("kernels.wgsl");

/// Where the kernel source comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KernelSource {
    #[default]
    Embedded,
    File(PathBuf),
}

impl KernelSource {
    fn load(&self) -> Result<(Cow<'static, str>, String)> {
        match self {
            KernelSource::Embedded => Ok((Cow::Borrowed(EQUALIZE_SHADER), "embedded".into())),
            KernelSource::File(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok((Cow::Owned(text), path.display().to_string()))
            }
        }
    }
}

/// Compiled kernels of the four stages, sharing one bind group layout.
#[derive(Debug)]
pub struct GpuEqualizePipeline {
    pub(super) bind_group_layout: wgpu::BindGroupLayout,
    histogram: wgpu::ComputePipeline,
    cumulative_histogram: wgpu::ComputePipeline,
    lookup_table: wgpu::ComputePipeline,
    back_projection: wgpu::ComputePipeline,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GpuEqualizePipeline {
    pub fn new(ctx: &Gpu, source: &KernelSource) -> Result<Self> {
        let (text, origin) = source.load()?;
        Self::from_source(ctx, &text, &origin)
    }

    /// Compiles `source`. Any compiler message of error severity, or any
    /// validation error raised while building the pipelines, is returned
    /// as [`Error::DeviceCompile`].
    pub fn from_source(ctx: &Gpu, source: &str, origin: &str) -> Result<Self> {
        let device = ctx.device();
        let options = format!(
            "source: {}; entry points: {}",
            origin,
            Stage::ALL.map(Stage::kernel_name).join(", ")
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("equalize_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let compilation = pollster::block_on(shader.get_compilation_info());

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("equalize_bind_group_layout"),
            entries: &[
                // Params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Input image
                storage_entry(1, true),
                // Histogram
                storage_entry(2, false),
                // Cumulative histogram
                storage_entry(3, false),
                // Lookup table
                storage_entry(4, false),
                // Output image
                storage_entry(5, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("equalize_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create = |stage: Stage| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(stage.kernel_name()),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(stage.kernel_name()),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let histogram = create(Stage::Histogram);
        let cumulative_histogram = create(Stage::CumulativeHistogram);
        let lookup_table = create(Stage::LookupTable);
        let back_projection = create(Stage::BackProjection);

        let scope_error = pollster::block_on(device.pop_error_scope());

        let mut log: Vec<String> = compilation
            .messages
            .iter()
            .map(|message| match &message.location {
                Some(location) => format!(
                    "{:?} {}:{}: {}",
                    message.message_type,
                    location.line_number,
                    location.line_position,
                    message.message
                ),
                None => format!("{:?}: {}", message.message_type, message.message),
            })
            .collect();
        let compile_failed = compilation
            .messages
            .iter()
            .any(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error));

        if compile_failed || scope_error.is_some() {
            if let Some(err) = scope_error {
                log.push(err.to_string());
            }
            let diagnostics = BuildDiagnostics {
                status: "error".to_string(),
                options,
                log: log.join("\n"),
            };
            tracing::error!(%diagnostics, "kernel build failed");
            return Err(Error::DeviceCompile(diagnostics));
        }

        for line in &log {
            tracing::debug!(origin, "{}", line);
        }

        Ok(Self {
            bind_group_layout,
            histogram,
            cumulative_histogram,
            lookup_table,
            back_projection,
        })
    }

    pub(super) fn stage(&self, stage: Stage) -> &wgpu::ComputePipeline {
        match stage {
            Stage::Histogram => &self.histogram,
            Stage::CumulativeHistogram => &self.cumulative_histogram,
            Stage::LookupTable => &self.lookup_table,
            Stage::BackProjection => &self.back_projection,
        }
    }
}

impl GpuPipeline for GpuEqualizePipeline {}
