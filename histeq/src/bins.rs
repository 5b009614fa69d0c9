use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Number of intensity levels of an 8-bit sample.
pub const INTENSITY_LEVELS: usize = 256;

/// Number of histogram bins, always in `1..=256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct BinCount(u16);

impl BinCount {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = INTENSITY_LEVELS as u16;

    /// One bin per intensity level.
    pub const FULL: BinCount = BinCount(Self::MAX);

    pub fn new(bins: u16) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&bins) {
            Ok(Self(bins))
        } else {
            Err(Error::InvalidBinCount(bins.to_string()))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Size in bytes of a `u32` buffer holding one counter per bin.
    pub fn buffer_size(self) -> u64 {
        (self.get() * std::mem::size_of::<u32>()) as u64
    }
}

/// Maps an intensity to its bin: `floor(value * bins / 256)`.
///
/// The WGSL kernels use the same expression, so both backends agree on
/// every bin boundary.
#[inline]
pub fn bin_index(value: u8, bins: BinCount) -> usize {
    (value as usize * bins.get()) / INTENSITY_LEVELS
}

impl Default for BinCount {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<i64> for BinCount {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u16::try_from(value)
            .map_err(|_| Error::InvalidBinCount(value.to_string()))
            .and_then(BinCount::new)
    }
}

impl TryFrom<u16> for BinCount {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        BinCount::new(value)
    }
}

impl From<BinCount> for u16 {
    fn from(bins: BinCount) -> Self {
        bins.0
    }
}

impl FromStr for BinCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| Error::InvalidBinCount(trimmed.to_string()))?;
        BinCount::try_from(value)
    }
}

impl fmt::Display for BinCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_count_range() {
        assert!(BinCount::new(0).is_err());
        assert!(BinCount::new(1).is_ok());
        assert!(BinCount::new(256).is_ok());
        assert!(BinCount::new(257).is_err());
        assert!(BinCount::try_from(-5i64).is_err());
        assert!(BinCount::try_from(70_000i64).is_err());
    }

    #[test]
    fn test_bin_count_from_str() {
        assert_eq!("16".parse::<BinCount>().unwrap().get(), 16);
        assert_eq!(" 256 \n".parse::<BinCount>().unwrap(), BinCount::FULL);
        assert!(matches!(
            "abc".parse::<BinCount>(),
            Err(Error::InvalidBinCount(s)) if s == "abc"
        ));
        assert!("12.5".parse::<BinCount>().is_err());
        assert!("".parse::<BinCount>().is_err());
        assert!("0".parse::<BinCount>().is_err());
    }

    #[test]
    fn test_bin_index_full_is_identity() {
        for v in 0..=255u8 {
            assert_eq!(bin_index(v, BinCount::FULL), v as usize);
        }
    }

    #[test]
    fn test_bin_index_single_bin() {
        let one = BinCount::new(1).unwrap();
        assert_eq!(bin_index(0, one), 0);
        assert_eq!(bin_index(255, one), 0);
    }

    #[test]
    fn test_bin_index_scaled() {
        let bins = BinCount::new(4).unwrap();
        assert_eq!(bin_index(0, bins), 0);
        assert_eq!(bin_index(63, bins), 0);
        assert_eq!(bin_index(64, bins), 1);
        assert_eq!(bin_index(191, bins), 2);
        assert_eq!(bin_index(255, bins), 3);

        // Every bin index stays in range for odd bin counts too.
        let bins = BinCount::new(7).unwrap();
        for v in 0..=255u8 {
            assert!(bin_index(v, bins) < 7);
        }
    }

    #[test]
    fn test_bin_count_serde() {
        let bins: BinCount = serde_json::from_str("64").unwrap();
        assert_eq!(bins.get(), 64);
        assert!(serde_json::from_str::<BinCount>("0").is_err());
        assert_eq!(serde_json::to_string(&bins).unwrap(), "64");
    }
}
