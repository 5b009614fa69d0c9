//! Four-stage equalization pipeline, generic over the compute backend.
//!
//! A run allocates a fresh arena of named buffers, uploads the input plane,
//! then dispatches the stages strictly in order. After every stage the
//! buffer it wrote is read back to the host before the next stage is
//! dispatched, so a stage only ever sees committed output. Any failure
//! drops the arena and returns the error; partial results are discarded.

mod timing;

use std::time::{Duration, Instant};

use tracing::{debug, debug_span};

pub use timing::{PipelineTimings, StageTiming};

use crate::bins::BinCount;
use crate::common::{Error, Result};
use crate::histogram::{CumulativeHistogram, Histogram, LookupTable};
use crate::image::{IntensityPlane, PlaneDesc};

/// Named buffers of a run arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum BufferName {
    #[strum(to_string = "input image")]
    Input,
    #[strum(to_string = "histogram")]
    Histogram,
    #[strum(to_string = "cumulative histogram")]
    CumulativeHistogram,
    #[strum(to_string = "lookup table")]
    LookupTable,
    #[strum(to_string = "output image")]
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Stage {
    #[strum(to_string = "Histogram")]
    Histogram,
    #[strum(to_string = "Cumulative Histogram")]
    CumulativeHistogram,
    #[strum(to_string = "LUT")]
    LookupTable,
    #[strum(to_string = "Back projection")]
    BackProjection,
}

impl Stage {
    /// Dispatch order.
    pub const ALL: [Stage; 4] = [
        Stage::Histogram,
        Stage::CumulativeHistogram,
        Stage::LookupTable,
        Stage::BackProjection,
    ];

    pub fn reads(self) -> &'static [BufferName] {
        match self {
            Stage::Histogram => &[BufferName::Input],
            Stage::CumulativeHistogram => &[BufferName::Histogram],
            Stage::LookupTable => &[BufferName::CumulativeHistogram],
            Stage::BackProjection => &[BufferName::Input, BufferName::LookupTable],
        }
    }

    pub fn writes(self) -> BufferName {
        match self {
            Stage::Histogram => BufferName::Histogram,
            Stage::CumulativeHistogram => BufferName::CumulativeHistogram,
            Stage::LookupTable => BufferName::LookupTable,
            Stage::BackProjection => BufferName::Output,
        }
    }

    /// Entry point of the stage in the kernel source.
    pub fn kernel_name(self) -> &'static str {
        match self {
            Stage::Histogram => "histogram",
            Stage::CumulativeHistogram => "cumulative_histogram",
            Stage::LookupTable => "histogram_lut",
            Stage::BackProjection => "back_proj",
        }
    }
}

/// A device (or thread pool) able to run the four stages.
///
/// The backend owns the storage of a run through its `Arena`; the
/// pipeline only refers to buffers by [`BufferName`].
pub trait ComputeBackend {
    type Arena;

    /// Human-readable device description.
    fn name(&self) -> String;

    /// Allocates every buffer of a run for a plane of `desc` and `bins` bins.
    fn allocate(&self, desc: PlaneDesc, bins: BinCount) -> Result<Self::Arena>;

    /// Copies the input plane into the arena.
    fn upload(&self, arena: &mut Self::Arena, plane: &IntensityPlane) -> Result<()>;

    /// Runs `stage` to completion. Returns the device-measured kernel time
    /// when the backend can provide one.
    fn run_stage(&self, arena: &mut Self::Arena, stage: Stage) -> Result<Option<Duration>>;

    /// Reads one of the bin-sized buffers back to the host.
    fn read_bins(&self, arena: &Self::Arena, buffer: BufferName) -> Result<Vec<u32>>;

    /// Reads the output plane back to the host.
    fn read_output(&self, arena: &Self::Arena) -> Result<Vec<u8>>;
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Equalized {
    pub output: IntensityPlane,
    pub histogram: Histogram,
    pub cumulative: CumulativeHistogram,
    pub lut: LookupTable,
    pub timings: PipelineTimings,
}

#[derive(Default)]
struct HostCopies {
    histogram: Vec<u32>,
    cumulative: Vec<u32>,
    lut: Vec<u32>,
    output: Vec<u8>,
}

/// Runs the four stages on one backend with a fixed bin count.
#[derive(Debug)]
pub struct EqualizePipeline<'a, B: ComputeBackend> {
    backend: &'a B,
    bins: BinCount,
}

impl<'a, B: ComputeBackend> EqualizePipeline<'a, B> {
    pub fn new(backend: &'a B, bins: BinCount) -> Self {
        Self { backend, bins }
    }

    pub fn bins(&self) -> BinCount {
        self.bins
    }

    pub fn run(&self, plane: &IntensityPlane) -> Result<Equalized> {
        let span = debug_span!(
            "equalize",
            backend = %self.backend.name(),
            bins = %self.bins,
            size = %plane.desc()
        );
        let _enter = span.enter();

        plane.desc().validate()?;

        let mut arena = self.backend.allocate(plane.desc(), self.bins)?;

        let start = Instant::now();
        self.backend.upload(&mut arena, plane)?;
        let upload = start.elapsed();

        let mut host = HostCopies::default();
        let mut stages = Vec::with_capacity(Stage::ALL.len());

        for stage in Stage::ALL {
            let start = Instant::now();
            let device_time = self.backend.run_stage(&mut arena, stage)?;
            let wall = start.elapsed();

            let start = Instant::now();
            self.read_back(&arena, stage.writes(), &mut host)?;
            let transfer = start.elapsed();

            let timing = StageTiming {
                stage,
                kernel: device_time.unwrap_or(wall),
                transfer,
                device_timed: device_time.is_some(),
            };
            debug!(
                stage = %stage,
                kernel_ns = timing.kernel.as_nanos() as u64,
                transfer_ns = timing.transfer.as_nanos() as u64,
                "stage complete"
            );
            stages.push(timing);
        }

        drop(arena);

        let desc = plane.desc();
        let output = IntensityPlane::new(desc.width, desc.height, host.output)?;
        let lut = host.lut.iter().map(|&v| v.min(255) as u8).collect();

        Ok(Equalized {
            output,
            histogram: Histogram(host.histogram),
            cumulative: CumulativeHistogram(host.cumulative),
            lut: LookupTable(lut),
            timings: PipelineTimings { upload, stages },
        })
    }

    fn read_back(&self, arena: &B::Arena, buffer: BufferName, host: &mut HostCopies) -> Result<()> {
        if buffer == BufferName::Output {
            host.output = self.backend.read_output(arena)?;
            return Ok(());
        }

        let values = self.backend.read_bins(arena, buffer)?;
        if values.len() != self.bins.get() {
            return Err(Error::runtime(
                format!("readback {}", buffer),
                "INVALID_BUFFER_SIZE",
                format!("expected {} bins, got {}", self.bins.get(), values.len()),
            ));
        }

        match buffer {
            BufferName::Histogram => host.histogram = values,
            BufferName::CumulativeHistogram => host.cumulative = values,
            BufferName::LookupTable => host.lut = values,
            BufferName::Input | BufferName::Output => {
                unreachable!("{} is never read back as bins", buffer)
            }
        }

        Ok(())
    }
}
