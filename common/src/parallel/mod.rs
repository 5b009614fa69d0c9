//! Parallel counting and scan primitives.
//!
//! Both run on the global rayon pool and are the CPU counterparts of the
//! atomic-histogram and workgroup-scan GPU kernels: `par_count_into` lets
//! every item bump its counter with a relaxed atomic add, and
//! `par_inclusive_scan` performs a Hillis–Steele scan where every doubling
//! pass completes before the next one starts.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

#[cfg(test)]
mod tests;

/// Multiplier for number of chunks relative to CPU threads.
/// Using 3x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 3;

/// Compute optimal chunk size for the given length.
#[inline]
pub fn auto_chunk_size(len: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (len / num_chunks).max(1)
}

/// Creates `len` zeroed atomic counters.
pub fn atomic_counters(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

/// Accumulates one count per item into `counters[key(item)]`.
///
/// Items are visited in parallel with no ordering guarantee; the result
/// is still deterministic because integer addition commutes.
///
/// # Panics
///
/// Panics if `key` returns an index outside `counters`.
pub fn par_count_into<T, F>(items: &[T], counters: &[AtomicU32], key: F)
where
    T: Sync,
    F: Fn(&T) -> usize + Sync,
{
    if items.is_empty() {
        return;
    }

    items
        .par_chunks(auto_chunk_size(items.len()))
        .for_each(|chunk| {
            for item in chunk {
                counters[key(item)].fetch_add(1, Ordering::Relaxed);
            }
        });
}

/// Like [`par_count_into`], but allocates and returns `bin_count` counters.
pub fn par_count<T, F>(items: &[T], bin_count: usize, key: F) -> Vec<u32>
where
    T: Sync,
    F: Fn(&T) -> usize + Sync,
{
    let counters = atomic_counters(bin_count);
    par_count_into(items, &counters, key);
    counters.into_iter().map(AtomicU32::into_inner).collect()
}

/// Inclusive prefix sum computed with a Hillis–Steele scan.
///
/// Each pass adds the element `offset` positions to the left, doubling
/// `offset` until it covers the whole slice. Passes are double-buffered,
/// so a pass only ever reads values committed by the previous one.
///
/// Partial sums are contiguous sub-ranges of the input, so no overflow is
/// possible as long as the total fits in `u32`.
pub fn par_inclusive_scan(values: &[u32]) -> Vec<u32> {
    let mut current = values.to_vec();
    let mut next = vec![0u32; values.len()];

    let mut offset = 1;
    while offset < current.len() {
        next.par_iter_mut().enumerate().for_each(|(i, slot)| {
            *slot = if i >= offset {
                current[i] + current[i - offset]
            } else {
                current[i]
            };
        });
        std::mem::swap(&mut current, &mut next);
        offset *= 2;
    }

    current
}

/// Sequential inclusive prefix sum, the reference for [`par_inclusive_scan`].
pub fn inclusive_scan_sequential(values: &[u32]) -> Vec<u32> {
    values
        .iter()
        .scan(0u32, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}
