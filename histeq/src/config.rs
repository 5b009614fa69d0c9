//! Run configuration, loadable from YAML or JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bins::BinCount;
use crate::common::Result;
use crate::gpu::KernelSource;

/// Which compute backend to run on.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendPreference {
    /// GPU if one can be opened, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EqualizeConfig {
    /// Bin count; asked for interactively when unset.
    pub bins: Option<u16>,
    pub backend: BackendPreference,
    /// Platform index as listed by `list_platforms`. With neither platform
    /// nor device set the default adapter is used.
    pub platform: Option<usize>,
    pub device: Option<usize>,
    /// WGSL file replacing the embedded kernels.
    pub kernel_source: Option<PathBuf>,
    /// Size of a dedicated CPU thread pool.
    pub threads: Option<usize>,
}

impl EqualizeConfig {
    /// Loads a config file; the format follows the file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = common::deserialize_file(path)?;
        config.bin_count()?;
        Ok(config)
    }

    pub fn bin_count(&self) -> Result<Option<BinCount>> {
        self.bins.map(BinCount::new).transpose()
    }

    pub fn kernel_source(&self) -> KernelSource {
        match &self.kernel_source {
            Some(path) => KernelSource::File(path.clone()),
            None => KernelSource::Embedded,
        }
    }
}
