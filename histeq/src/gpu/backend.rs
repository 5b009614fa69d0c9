use std::sync::mpsc;
use std::time::Duration;

use wgpu::util::DeviceExt;

use super::{Gpu, GpuEqualizePipeline};
use crate::bins::BinCount;
use crate::common::{Error, Result};
use crate::image::{IntensityPlane, PlaneDesc};
use crate::pipeline::{BufferName, ComputeBackend, Stage};

const WORKGROUP_SIZE: u32 = 256;

/// wgpu rejects zero-sized bindings.
const MIN_BUFFER_SIZE: u64 = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    pixel_count: u32,
    bin_count: u32,
    row_stride: u32,
    word_count: u32,
}

/// Workgroup grid of the per-word kernels. Group counts above the
/// per-dimension limit spill into y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DispatchLayout {
    pub x: u32,
    pub y: u32,
}

impl DispatchLayout {
    pub(super) fn for_words(word_count: u32, max_per_dimension: u32) -> Self {
        let groups = word_count.div_ceil(WORKGROUP_SIZE);
        if groups == 0 {
            return Self { x: 0, y: 0 };
        }
        let x = groups.min(max_per_dimension.max(1));
        Self {
            x,
            y: groups.div_ceil(x),
        }
    }

    /// Invocations in one row of the grid.
    pub(super) fn row_stride(&self) -> u32 {
        self.x * WORKGROUP_SIZE
    }

    fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0
    }
}

#[derive(Debug)]
struct TimestampQueries {
    query_set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    period: f32,
}

/// Device buffers of one GPU run.
#[derive(Debug)]
pub struct GpuArena {
    desc: PlaneDesc,
    bins: BinCount,
    word_count: u32,
    dispatch: DispatchLayout,
    input: wgpu::Buffer,
    histogram: wgpu::Buffer,
    cumulative: wgpu::Buffer,
    lut: wgpu::Buffer,
    output: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    timestamps: Option<TimestampQueries>,
}

impl GpuArena {
    fn buffer(&self, name: BufferName) -> &wgpu::Buffer {
        match name {
            BufferName::Input => &self.input,
            BufferName::Histogram => &self.histogram,
            BufferName::CumulativeHistogram => &self.cumulative,
            BufferName::LookupTable => &self.lut,
            BufferName::Output => &self.output,
        }
    }
}

/// Runs the stages with the compiled kernels of a [`GpuEqualizePipeline`].
#[derive(Debug)]
pub struct GpuBackend<'a> {
    gpu: Gpu,
    pipeline: &'a GpuEqualizePipeline,
}

impl<'a> GpuBackend<'a> {
    pub fn new(gpu: Gpu, pipeline: &'a GpuEqualizePipeline) -> Self {
        Self { gpu, pipeline }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn create_storage(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.max(MIN_BUFFER_SIZE),
            usage: wgpu::BufferUsages::STORAGE | usage,
            mapped_at_creation: false,
        })
    }

    fn create_timestamps(&self) -> Option<TimestampQueries> {
        if !self.gpu.has_timestamps() {
            return None;
        }
        let device = self.gpu.device();
        let size = 2 * std::mem::size_of::<u64>() as u64;
        Some(TimestampQueries {
            query_set: device.create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("equalize_timestamps"),
                ty: wgpu::QueryType::Timestamp,
                count: 2,
            }),
            resolve: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("equalize_timestamps_resolve"),
                size,
                usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }),
            readback: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("equalize_timestamps_readback"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            period: self.gpu.queue().get_timestamp_period(),
        })
    }

    /// Runs `record` inside validation and out-of-memory error scopes and
    /// turns a captured error into [`Error::DeviceRuntime`].
    fn scoped<R>(&self, stage: &str, record: impl FnOnce() -> R) -> Result<R> {
        let device = self.gpu.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let result = record();

        let out_of_memory = pollster::block_on(device.pop_error_scope());
        let validation = pollster::block_on(device.pop_error_scope());
        match out_of_memory.or(validation) {
            Some(err) => Err(Error::from_wgpu(stage, &err)),
            None => Ok(result),
        }
    }

    /// Copies `size` bytes of `source` to a mappable buffer and returns them.
    fn read_buffer(&self, stage: &str, source: &wgpu::Buffer, size: u64) -> Result<Vec<u8>> {
        let device = self.gpu.device();
        let staging = self.scoped(stage, || {
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("equalize_staging"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("equalize_readback_encoder"),
            });
            encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
            self.gpu.queue().submit(std::iter::once(encoder.finish()));
            staging
        })?;

        self.map_read(stage, &staging)
    }

    fn map_read(&self, stage: &str, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.gpu.wait(stage)?;

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Error::runtime(stage, "MAP_FAILED", e.to_string())),
            Err(_) => {
                return Err(Error::runtime(
                    stage,
                    "MAP_FAILED",
                    "buffer mapping callback was dropped",
                ));
            }
        }

        let data = slice.get_mapped_range();
        let bytes = data.to_vec();
        drop(data);
        buffer.unmap();
        Ok(bytes)
    }

    fn read_timestamps(&self, stage: &str, queries: &TimestampQueries) -> Result<Duration> {
        let bytes = self.map_read(stage, &queries.readback)?;
        let ticks: Vec<u64> = bytemuck::pod_collect_to_vec(&bytes);
        let elapsed = ticks[1].saturating_sub(ticks[0]);
        Ok(Duration::from_nanos(
            (elapsed as f64 * queries.period as f64) as u64,
        ))
    }
}

impl ComputeBackend for GpuBackend<'_> {
    type Arena = GpuArena;

    fn name(&self) -> String {
        format!("GPU ({})", self.gpu)
    }

    fn allocate(&self, desc: PlaneDesc, bins: BinCount) -> Result<GpuArena> {
        let pixel_count = u32::try_from(desc.pixel_count()).map_err(|_| {
            Error::InvalidImage(format!("{} does not fit 32-bit pixel indices", desc))
        })?;
        let word_count = pixel_count.div_ceil(4);
        let max_groups = self.gpu.device().limits().max_compute_workgroups_per_dimension;
        let dispatch = DispatchLayout::for_words(word_count, max_groups);

        let params = Params {
            pixel_count,
            bin_count: bins.get() as u32,
            row_stride: dispatch.row_stride(),
            word_count,
        };
        let image_size = word_count as u64 * 4;
        let bin_size = bins.buffer_size();

        self.scoped("allocate", || {
            let device = self.gpu.device();
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("equalize_params_buffer"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let copy_both = wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
            let input = self.create_storage("equalize_input", image_size, wgpu::BufferUsages::COPY_DST);
            let histogram = self.create_storage("equalize_histogram", bin_size, copy_both);
            let cumulative = self.create_storage("equalize_cumulative", bin_size, copy_both);
            let lut = self.create_storage("equalize_lut", bin_size, copy_both);
            let output = self.create_storage("equalize_output", image_size, wgpu::BufferUsages::COPY_SRC);

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("equalize_bind_group"),
                layout: &self.pipeline.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: input.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: histogram.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: cumulative.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: lut.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: output.as_entire_binding(),
                    },
                ],
            });

            GpuArena {
                desc,
                bins,
                word_count,
                dispatch,
                input,
                histogram,
                cumulative,
                lut,
                output,
                bind_group,
                timestamps: self.create_timestamps(),
            }
        })
    }

    fn upload(&self, arena: &mut GpuArena, plane: &IntensityPlane) -> Result<()> {
        if plane.desc() != arena.desc {
            return Err(Error::runtime(
                "upload",
                "INVALID_BUFFER_SIZE",
                format!("arena is {}, plane is {}", arena.desc, plane.desc()),
            ));
        }

        let pixels = plane.pixels();
        let aligned = pixels.len() / 4 * 4;
        self.scoped("upload", || {
            let queue = self.gpu.queue();
            if aligned > 0 {
                queue.write_buffer(&arena.input, 0, &pixels[..aligned]);
            }
            if aligned < pixels.len() {
                let mut tail = [0u8; 4];
                tail[..pixels.len() - aligned].copy_from_slice(&pixels[aligned..]);
                queue.write_buffer(&arena.input, aligned as u64, &tail);
            }
            queue.submit(std::iter::empty());
        })?;
        self.gpu.wait("upload")
    }

    fn run_stage(&self, arena: &mut GpuArena, stage: Stage) -> Result<Option<Duration>> {
        let name = stage.to_string();
        let per_word = matches!(stage, Stage::Histogram | Stage::BackProjection);
        if per_word && arena.dispatch.is_empty() {
            // Empty image: the histogram stays cleared and no output exists.
            if stage == Stage::Histogram {
                self.scoped(&name, || {
                    let mut encoder = self.gpu.device().create_command_encoder(
                        &wgpu::CommandEncoderDescriptor {
                            label: Some("equalize_clear_encoder"),
                        },
                    );
                    encoder.clear_buffer(&arena.histogram, 0, None);
                    self.gpu.queue().submit(std::iter::once(encoder.finish()));
                })?;
                self.gpu.wait(&name)?;
            }
            return Ok(None);
        }

        let (x, y) = if per_word {
            (arena.dispatch.x, arena.dispatch.y)
        } else {
            (1, 1)
        };

        self.scoped(&name, || {
            let device = self.gpu.device();
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(stage.kernel_name()),
            });

            if stage == Stage::Histogram {
                encoder.clear_buffer(&arena.histogram, 0, None);
            }

            {
                let timestamp_writes =
                    arena
                        .timestamps
                        .as_ref()
                        .map(|q| wgpu::ComputePassTimestampWrites {
                            query_set: &q.query_set,
                            beginning_of_pass_write_index: Some(0),
                            end_of_pass_write_index: Some(1),
                        });
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(stage.kernel_name()),
                    timestamp_writes,
                });
                compute_pass.set_pipeline(self.pipeline.stage(stage));
                compute_pass.set_bind_group(0, &arena.bind_group, &[]);
                compute_pass.dispatch_workgroups(x, y, 1);
            }

            if let Some(queries) = &arena.timestamps {
                encoder.resolve_query_set(&queries.query_set, 0..2, &queries.resolve, 0);
                encoder.copy_buffer_to_buffer(
                    &queries.resolve,
                    0,
                    &queries.readback,
                    0,
                    queries.resolve.size(),
                );
            }

            self.gpu.queue().submit(std::iter::once(encoder.finish()));
        })?;
        self.gpu.wait(&name)?;

        match &arena.timestamps {
            Some(queries) => self.read_timestamps(&name, queries).map(Some),
            None => Ok(None),
        }
    }

    fn read_bins(&self, arena: &GpuArena, buffer: BufferName) -> Result<Vec<u32>> {
        let stage = format!("readback {}", buffer);
        let bytes = self.read_buffer(&stage, arena.buffer(buffer), arena.bins.buffer_size())?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    fn read_output(&self, arena: &GpuArena) -> Result<Vec<u8>> {
        let pixel_count = arena.desc.pixel_count();
        if pixel_count == 0 {
            return Ok(Vec::new());
        }
        let stage = format!("readback {}", BufferName::Output);
        let mut bytes = self.read_buffer(&stage, &arena.output, arena.word_count as u64 * 4)?;
        bytes.truncate(pixel_count);
        Ok(bytes)
    }
}
