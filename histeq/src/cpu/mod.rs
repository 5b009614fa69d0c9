//! Rayon implementation of the four stages.
//!
//! The free functions are the stage kernels and can be used on their own;
//! [`CpuBackend`] wraps them in the arena protocol the pipeline expects.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::parallel::{atomic_counters, par_count_into, par_inclusive_scan};
use rayon::prelude::*;

use crate::bins::{bin_index, BinCount};
use crate::common::{Error, Result};
use crate::image::{IntensityPlane, PlaneDesc};
use crate::pipeline::{BufferName, ComputeBackend, Stage};

/// Counts every pixel into its bin with atomic increments.
pub fn histogram(pixels: &[u8], bins: BinCount) -> Vec<u32> {
    let counters = atomic_counters(bins.get());
    accumulate_histogram(pixels, bins, &counters);
    counters.into_iter().map(AtomicU32::into_inner).collect()
}

fn accumulate_histogram(pixels: &[u8], bins: BinCount, counters: &[AtomicU32]) {
    par_count_into(pixels, counters, |&v| bin_index(v, bins));
}

/// Inclusive prefix sum of `histogram` (parallel Hillis–Steele scan).
pub fn cumulative_histogram(histogram: &[u32]) -> Vec<u32> {
    par_inclusive_scan(histogram)
}

/// One lookup-table entry: `round(count * 255 / total)`, rounding half up.
///
/// An empty image (`total == 0`) maps to 0.
#[inline]
pub fn lut_entry(count: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let total = total as u64;
    let scaled = (count as u64 * 255 + total / 2) / total;
    scaled.min(255) as u8
}

/// Normalizes a cumulative histogram into a lookup table.
pub fn lookup_table(cumulative: &[u32]) -> Vec<u8> {
    let total = cumulative.last().copied().unwrap_or(0);
    cumulative.par_iter().map(|&c| lut_entry(c, total)).collect()
}

/// Remaps every pixel through `lut`.
pub fn back_project(pixels: &[u8], lut: &[u8], bins: BinCount) -> Vec<u8> {
    debug_assert_eq!(lut.len(), bins.get());
    pixels.par_iter().map(|&v| lut[bin_index(v, bins)]).collect()
}

/// Buffers of one CPU run.
#[derive(Debug)]
pub struct CpuArena {
    desc: PlaneDesc,
    bins: BinCount,
    input: Vec<u8>,
    histogram: Vec<AtomicU32>,
    histogram_done: bool,
    cumulative: Option<Vec<u32>>,
    lut: Option<Vec<u8>>,
    output: Option<Vec<u8>>,
}

impl CpuArena {
    fn missing(stage: Stage, buffer: BufferName) -> Error {
        Error::runtime(
            stage.to_string(),
            "MISSING_INPUT",
            format!("{} has not been produced yet", buffer),
        )
    }

    fn histogram_values(&self) -> Vec<u32> {
        self.histogram
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}

/// Runs the stages on a rayon thread pool.
///
/// Uses the global pool unless built with [`CpuBackend::with_threads`].
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("histeq-cpu-{}", i))
            .build()
            .map_err(|e| Error::DeviceUnavailable(format!("CPU thread pool: {}", e)))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl ComputeBackend for CpuBackend {
    type Arena = CpuArena;

    fn name(&self) -> String {
        format!("CPU ({} threads)", self.threads())
    }

    fn allocate(&self, desc: PlaneDesc, bins: BinCount) -> Result<CpuArena> {
        Ok(CpuArena {
            desc,
            bins,
            input: Vec::with_capacity(desc.pixel_count()),
            histogram: atomic_counters(bins.get()),
            histogram_done: false,
            cumulative: None,
            lut: None,
            output: None,
        })
    }

    fn upload(&self, arena: &mut CpuArena, plane: &IntensityPlane) -> Result<()> {
        if plane.desc() != arena.desc {
            return Err(Error::runtime(
                "upload",
                "INVALID_BUFFER_SIZE",
                format!("arena is {}, plane is {}", arena.desc, plane.desc()),
            ));
        }
        arena.input.clear();
        arena.input.extend_from_slice(plane.pixels());
        Ok(())
    }

    fn run_stage(&self, arena: &mut CpuArena, stage: Stage) -> Result<Option<Duration>> {
        let bins = arena.bins;
        match stage {
            Stage::Histogram => {
                for counter in &arena.histogram {
                    counter.store(0, Ordering::Relaxed);
                }
                let (input, counters) = (&arena.input, &arena.histogram);
                self.install(|| accumulate_histogram(input, bins, counters));
                arena.histogram_done = true;
            }
            Stage::CumulativeHistogram => {
                if !arena.histogram_done {
                    return Err(CpuArena::missing(stage, BufferName::Histogram));
                }
                let histogram = arena.histogram_values();
                arena.cumulative = Some(self.install(|| cumulative_histogram(&histogram)));
            }
            Stage::LookupTable => {
                let cumulative = arena
                    .cumulative
                    .as_deref()
                    .ok_or_else(|| CpuArena::missing(stage, BufferName::CumulativeHistogram))?;
                arena.lut = Some(self.install(|| lookup_table(cumulative)));
            }
            Stage::BackProjection => {
                let lut = arena
                    .lut
                    .as_deref()
                    .ok_or_else(|| CpuArena::missing(stage, BufferName::LookupTable))?;
                let input = &arena.input;
                arena.output = Some(self.install(|| back_project(input, lut, bins)));
            }
        }
        Ok(None)
    }

    fn read_bins(&self, arena: &CpuArena, buffer: BufferName) -> Result<Vec<u32>> {
        let missing = || {
            Error::runtime(
                format!("readback {}", buffer),
                "MISSING_OUTPUT",
                format!("{} has not been produced yet", buffer),
            )
        };
        match buffer {
            BufferName::Histogram if arena.histogram_done => Ok(arena.histogram_values()),
            BufferName::CumulativeHistogram => arena.cumulative.clone().ok_or_else(missing),
            BufferName::LookupTable => arena
                .lut
                .as_ref()
                .map(|lut| lut.iter().map(|&v| v as u32).collect())
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    fn read_output(&self, arena: &CpuArena) -> Result<Vec<u8>> {
        arena.output.clone().ok_or_else(|| {
            Error::runtime(
                format!("readback {}", BufferName::Output),
                "MISSING_OUTPUT",
                "back projection has not run",
            )
        })
    }
}
