/// Compute pipeline
///
/// Independent of any render target, so it is built once and never rebuilt.
/// Shares the cache behavior of graphics pipelines: loaded at creation,
/// saved on drop.

use std::sync::Arc;

use crate::engine_warn;
use crate::error::Result;
use crate::graphics_device::{
    ComputePipelineCreateInfo, ComputePipelineDesc, GraphicsDevice, PipelineCache, PipelineObject,
};
use crate::pipeline::PipelineCacheStore;

pub struct ComputePipeline {
    name: String,
    desc: ComputePipelineDesc,
    handle: Arc<dyn PipelineObject>,
    cache: Box<dyn PipelineCache>,
    store: PipelineCacheStore,
}

impl ComputePipeline {
    pub fn create(
        device: &dyn GraphicsDevice,
        name: &str,
        desc: ComputePipelineDesc,
        store: &PipelineCacheStore,
    ) -> Result<Arc<Self>> {
        let cache = device.create_pipeline_cache(&store.load(name))?;
        let handle = device.create_compute_pipeline(&ComputePipelineCreateInfo {
            name,
            desc: &desc,
            cache: Some(cache.as_ref()),
        })?;

        Ok(Arc::new(Self {
            name: name.to_string(),
            desc,
            handle,
            cache,
            store: store.clone(),
        }))
    }

    pub fn handle(&self) -> Arc<dyn PipelineObject> {
        self.handle.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &ComputePipelineDesc {
        &self.desc
    }

    /// Persist the pipeline cache
    pub fn save_cache(&self) -> Result<()> {
        if !self.store.is_enabled() {
            return Ok(());
        }
        self.store.save(&self.name, &self.cache.data()?)
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        if let Err(e) = self.save_cache() {
            engine_warn!("flint3d::ComputePipeline", "Pipeline '{}': cache not saved: {}", self.name, e);
        }
    }
}
