/// Graphics pipeline bound to one render target
///
/// Built against the target's render pass, extent and formats. The target
/// keeps a `Weak` to it and calls `rebuild()` after every recreate; the
/// device pipeline object is swapped under a write lock, so recording
/// threads always see either the old or the new pipeline, never a gap.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::graphics_device::{
    DynamicStateFlags, GraphicsDevice, GraphicsPipelineCreateInfo, GraphicsPipelineDesc,
    PipelineCache, PipelineObject,
};
use crate::pipeline::PipelineCacheStore;
use crate::target::{RenderTarget, RenderTargetId, RenderTargetLayout};
use crate::{engine_debug, engine_trace, engine_warn};

const SOURCE: &str = "flint3d::GraphicsPipeline";

struct BuiltPipeline {
    handle: Arc<dyn PipelineObject>,
    layout: RenderTargetLayout,
}

pub struct GraphicsPipeline {
    name: String,
    desc: GraphicsPipelineDesc,
    target_id: RenderTargetId,
    built: RwLock<BuiltPipeline>,
    cache: Box<dyn PipelineCache>,
    store: PipelineCacheStore,
}

impl GraphicsPipeline {
    /// Build a pipeline for `target` and register it for rebuilds
    ///
    /// # Arguments
    ///
    /// * `device` - Device the pipeline is created on
    /// * `target` - Render target whose layout the pipeline is built against
    /// * `name` - Debug name, also the cache file name
    /// * `desc` - Shaders and fixed-function state
    /// * `store` - Where the pipeline cache is loaded from and saved to
    pub fn create(
        device: &dyn GraphicsDevice,
        target: &mut dyn RenderTarget,
        name: &str,
        desc: GraphicsPipelineDesc,
        store: &PipelineCacheStore,
    ) -> Result<Arc<Self>> {
        let layout = target.layout()?;
        let cache = device.create_pipeline_cache(&store.load(name))?;
        let handle = build(device, name, &desc, &layout, cache.as_ref())?;

        let pipeline = Arc::new(Self {
            name: name.to_string(),
            desc,
            target_id: target.id(),
            built: RwLock::new(BuiltPipeline { handle, layout }),
            cache,
            store: store.clone(),
        });
        target.attach_pipeline(Arc::downgrade(&pipeline));

        engine_debug!(SOURCE, "Pipeline '{}' created for render target '{}'", name, target.name());
        Ok(pipeline)
    }

    /// Adapt to a recreated render target
    ///
    /// A full rebuild happens when the attachment formats or sample count
    /// changed, or when the extent changed and viewport or scissor is baked
    /// into the pipeline. Otherwise only the new layout is recorded.
    ///
    /// # Returns
    ///
    /// `true` if the device pipeline object was rebuilt.
    pub fn rebuild(&self, device: &dyn GraphicsDevice, layout: &RenderTargetLayout) -> Result<bool> {
        let mut built = self.built.write().unwrap_or_else(PoisonError::into_inner);

        let static_viewport = !self
            .desc
            .dynamic_states
            .contains(DynamicStateFlags::VIEWPORT | DynamicStateFlags::SCISSOR);
        let full = !built.layout.is_format_compatible(layout)
            || (static_viewport && built.layout.extent != layout.extent);

        if full {
            built.handle = build(device, &self.name, &self.desc, layout, self.cache.as_ref())?;
            engine_debug!(SOURCE, "Pipeline '{}' rebuilt for {}", self.name, layout.extent);
        } else {
            engine_trace!(SOURCE, "Pipeline '{}' kept for {}", self.name, layout.extent);
        }
        built.layout = layout.clone();
        Ok(full)
    }

    /// Current device pipeline object
    pub fn handle(&self) -> Arc<dyn PipelineObject> {
        self.built.read().unwrap_or_else(PoisonError::into_inner).handle.clone()
    }

    /// Layout the pipeline currently matches
    pub fn layout(&self) -> RenderTargetLayout {
        self.built.read().unwrap_or_else(PoisonError::into_inner).layout.clone()
    }

    /// Render target the pipeline was built for
    pub fn target_id(&self) -> RenderTargetId {
        self.target_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &GraphicsPipelineDesc {
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

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.save_cache() {
            engine_warn!(SOURCE, "Pipeline '{}': cache not saved: {}", self.name, e);
        }
    }
}

fn build(
    device: &dyn GraphicsDevice,
    name: &str,
    desc: &GraphicsPipelineDesc,
    layout: &RenderTargetLayout,
    cache: &dyn PipelineCache,
) -> Result<Arc<dyn PipelineObject>> {
    device.create_graphics_pipeline(&GraphicsPipelineCreateInfo {
        name,
        desc,
        render_pass: layout.render_pass.as_ref(),
        extent: layout.extent,
        samples: layout.samples,
        color_attachment_count: layout.color_formats.len() as u32,
        cache: Some(cache),
    })
}

#[cfg(test)]
#[path = "graphics_pipeline_tests.rs"]
mod tests;
