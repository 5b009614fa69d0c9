use crate::common::Result;
use crate::image::PlaneDesc;
use crate::processing_context::ProcessingContext;

/// Result of backend selection for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Backend {
    Cpu,
    Gpu,
}

/// Selects the backend an operation on a plane of `desc` runs on.
///
/// The plane is validated first, so an unsupported size is reported
/// before any device work. The GPU is used whenever the context has one.
pub fn select_backend(ctx: &ProcessingContext, desc: PlaneDesc, op_name: &str) -> Result<Backend> {
    desc.validate()?;

    let backend = if ctx.has_gpu() {
        Backend::Gpu
    } else {
        Backend::Cpu
    };
    tracing::debug!(op = op_name, %backend, size = %desc, "backend selected");
    Ok(backend)
}
