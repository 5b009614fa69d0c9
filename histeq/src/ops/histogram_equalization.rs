use crate::gpu::{GpuBackend, GpuEqualizePipeline};
use crate::ops::{Backend, select_backend};
use crate::prelude::*;

/// Histogram equalization with a fixed number of bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistogramEqualization {
    pub bins: BinCount,
}

impl HistogramEqualization {
    pub fn new(bins: BinCount) -> Self {
        Self { bins }
    }

    /// Equalizes `plane` on the GPU when the context has one, otherwise on
    /// the CPU.
    pub fn execute(&self, ctx: &mut ProcessingContext, plane: &IntensityPlane) -> Result<Equalized> {
        match select_backend(ctx, plane.desc(), "HistogramEqualization")? {
            Backend::Gpu => self.execute_gpu(ctx, plane),
            Backend::Cpu => self.execute_cpu(ctx, plane),
        }
    }

    pub fn execute_cpu(&self, ctx: &ProcessingContext, plane: &IntensityPlane) -> Result<Equalized> {
        EqualizePipeline::new(ctx.cpu(), self.bins).run(plane)
    }

    /// Runs on the context's GPU, compiling the kernels on first use.
    pub fn execute_gpu(
        &self,
        ctx: &mut ProcessingContext,
        plane: &IntensityPlane,
    ) -> Result<Equalized> {
        let gpu_context = ctx
            .gpu_context()
            .ok_or_else(|| Error::DeviceUnavailable("GPU context not available".to_string()))?;

        let gpu = gpu_context.gpu().clone();
        let pipeline = gpu_context.get_or_create(GpuEqualizePipeline::new)?;
        let backend = GpuBackend::new(gpu, pipeline);

        EqualizePipeline::new(&backend, self.bins).run(plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_on_cpu_context() {
        let mut ctx = ProcessingContext::cpu_only();
        let plane = IntensityPlane::new(2, 2, vec![10, 10, 200, 200]).unwrap();

        let result = HistogramEqualization::default()
            .execute(&mut ctx, &plane)
            .unwrap();
        assert_eq!(result.output.pixels(), &[128, 128, 255, 255]);
    }

    #[test]
    fn test_execute_gpu_without_gpu_fails() {
        let mut ctx = ProcessingContext::cpu_only();
        let plane = IntensityPlane::filled(2, 2, 0).unwrap();

        let err = HistogramEqualization::default()
            .execute_gpu(&mut ctx, &plane)
            .unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable(_)));
    }

    #[test]
    fn test_execute_matches_cpu() {
        let mut ctx = ProcessingContext::new();
        let pixels = (0..64 * 48).map(|i| ((i * 7) % 251) as u8).collect();
        let plane = IntensityPlane::new(64, 48, pixels).unwrap();
        let op = HistogramEqualization::new(BinCount::new(32).unwrap());

        let expected = op.execute_cpu(&ctx, &plane).unwrap();
        let actual = op.execute(&mut ctx, &plane).unwrap();
        assert_eq!(actual.output, expected.output);
        assert_eq!(actual.lut, expected.lut);
    }
}
