use std::fmt;
use std::time::Duration;

use super::Stage;

/// Measured cost of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: Stage,
    /// Kernel execution time. Taken from device timestamps when
    /// `device_timed` is set, otherwise host wall time of dispatch + wait.
    pub kernel: Duration,
    /// Host wall time spent reading the stage output back.
    pub transfer: Duration,
    pub device_timed: bool,
}

/// Per-stage timings of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineTimings {
    /// Host wall time of the input upload.
    pub upload: Duration,
    pub stages: Vec<StageTiming>,
}

impl PipelineTimings {
    pub fn stage(&self, stage: Stage) -> Option<&StageTiming> {
        self.stages.iter().find(|t| t.stage == stage)
    }

    /// Sum of the kernel times of all stages.
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|t| t.kernel).sum()
    }

    /// Kernel, transfer and upload time together.
    pub fn wall_total(&self) -> Duration {
        self.upload
            + self
                .stages
                .iter()
                .map(|t| t.kernel + t.transfer)
                .sum::<Duration>()
    }
}

impl fmt::Display for PipelineTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input upload [ns]: {}", self.upload.as_nanos())?;
        for timing in &self.stages {
            let source = if timing.device_timed { "device" } else { "host" };
            writeln!(
                f,
                "{} kernel execution time [ns]: {} ({})",
                timing.stage,
                timing.kernel.as_nanos(),
                source
            )?;
            writeln!(
                f,
                "{} memory transfer [ns]: {}",
                timing.stage,
                timing.transfer.as_nanos()
            )?;
        }
        write!(
            f,
            "Total program execution time [ns]: {}",
            self.total().as_nanos()
        )
    }
}
