use std::any::{Any, TypeId};

use hashbrown::HashMap;

use crate::prelude::*;

/// Trait marker for GPU pipelines that can be cached.
pub trait GpuPipeline: Any + std::fmt::Debug + Send + Sync {}

/// A GPU device plus the pipelines compiled for it.
///
/// Pipelines are built on first use and stored by their TypeId, so kernels
/// compile once per context no matter how many images are processed.
#[derive(Debug)]
pub struct GpuContext {
    gpu: Gpu,
    kernels: KernelSource,
    pipelines: HashMap<TypeId, Box<dyn GpuPipeline>>,
}

impl GpuContext {
    pub fn new(gpu: Gpu) -> Self {
        Self::with_kernels(gpu, KernelSource::Embedded)
    }

    /// Builds pipelines from `kernels` instead of the embedded source.
    pub fn with_kernels(gpu: Gpu, kernels: KernelSource) -> Self {
        Self {
            gpu,
            kernels,
            pipelines: HashMap::new(),
        }
    }

    /// Returns the pipeline of type T, creating it with the provided function if needed.
    pub fn get_or_create<T, F>(&mut self, create: F) -> Result<&T>
    where
        T: GpuPipeline,
        F: FnOnce(&Gpu, &KernelSource) -> Result<T>,
    {
        let type_id = TypeId::of::<T>();

        if !self.pipelines.contains_key(&type_id) {
            let pipeline = create(&self.gpu, &self.kernels)?;
            tracing::debug!(pipeline = std::any::type_name::<T>(), "GPU pipeline created");
            self.pipelines.insert(type_id, Box::new(pipeline));
        }

        Ok(self
            .pipelines
            .get(&type_id)
            .and_then(|p| (p.as_ref() as &dyn Any).downcast_ref::<T>())
            .expect("pipeline type mismatch - this is a bug"))
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn kernels(&self) -> &KernelSource {
        &self.kernels
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}
