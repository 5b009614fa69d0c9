use std::fmt;
use std::io;

/// Kernel build diagnostics captured when the device fails to compile.
///
/// Mirrors the three things a driver reports for a failed program build:
/// a status line, the options the build ran with, and the compiler log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDiagnostics {
    pub status: String,
    pub options: String,
    pub log: String,
}

impl fmt::Display for BuildDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build Status: {}", self.status)?;
        writeln!(f, "Build Options:\t{}", self.options)?;
        write!(f, "Build Log:\t {}", self.log)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid bin count '{0}': expected an integer in range 1-256")]
    InvalidBinCount(String),

    #[error("Kernel build failed\n{0}")]
    DeviceCompile(BuildDiagnostics),

    #[error("{stage} failed: {code}, {description}")]
    DeviceRuntime {
        stage: String,
        code: &'static str,
        description: String,
    },

    #[error("Compute device not available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to load image {path}: {reason}")]
    ImageDecode { path: String, reason: String },

    #[error("Failed to write image: {0}")]
    ImageEncode(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Builds a runtime failure for `stage` from a wgpu error.
    pub(crate) fn from_wgpu(stage: impl Into<String>, err: &wgpu::Error) -> Self {
        let code = match err {
            wgpu::Error::OutOfMemory { .. } => "OUT_OF_MEMORY",
            wgpu::Error::Validation { .. } => "VALIDATION",
            wgpu::Error::Internal { .. } => "INTERNAL",
            #[allow(unreachable_patterns)]
            _ => "UNKNOWN",
        };
        Error::DeviceRuntime {
            stage: stage.into(),
            code,
            description: err.to_string(),
        }
    }

    /// Builds a runtime failure with an explicit code.
    pub(crate) fn runtime(
        stage: impl Into<String>,
        code: &'static str,
        description: impl Into<String>,
    ) -> Self {
        Error::DeviceRuntime {
            stage: stage.into(),
            code,
            description: description.into(),
        }
    }

    /// Returns true for errors that are fixed by asking the user again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InvalidBinCount(_))
    }
}

impl From<common::FileFormatError> for Error {
    fn from(e: common::FileFormatError) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
