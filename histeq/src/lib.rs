//! Histogram equalization of 8-bit intensity images.
//!
//! The work runs as four dependent stages (histogram, cumulative
//! histogram, lookup table, back projection) on either a wgpu device or a
//! rayon thread pool. Colour images are equalized on their luma plane only.

mod bins;
mod common;
pub mod config;
pub mod cpu;
mod gpu;
mod histogram;
pub mod image;
mod ops;
mod pipeline;
mod processing_context;

pub mod prelude;

pub use prelude::*;
