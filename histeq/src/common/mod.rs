pub(crate) mod error;
#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{BuildDiagnostics, Error, Result};
