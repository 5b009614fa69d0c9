use crate::gpu::Gpu;

/// Opens the default adapter, or returns `None` on machines without one.
pub(crate) fn test_gpu() -> Option<Gpu> {
    match Gpu::new() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("Skipping test - no GPU available: {}", e);
            None
        }
    }
}
