//! Host-side copies of the per-run bin buffers.

use std::ops::Deref;

/// Pixel count per bin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram(pub(crate) Vec<u32>);

/// Inclusive prefix sum of a [`Histogram`]; the last entry is the pixel count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CumulativeHistogram(pub(crate) Vec<u32>);

/// Equalized output intensity for every bin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupTable(pub(crate) Vec<u8>);

impl Histogram {
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| c as u64).sum()
    }
}

impl CumulativeHistogram {
    pub fn total(&self) -> u32 {
        self.0.last().copied().unwrap_or(0)
    }

    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }
}

macro_rules! bin_buffer {
    ($name:ident, $item:ty) => {
        impl $name {
            pub fn into_vec(self) -> Vec<$item> {
                self.0
            }
        }

        impl Deref for $name {
            type Target = [$item];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<Vec<$item>> for $name {
            fn from(values: Vec<$item>) -> Self {
                Self(values)
            }
        }
    };
}

bin_buffer!(Histogram, u32);
bin_buffer!(CumulativeHistogram, u32);
bin_buffer!(LookupTable, u8);
