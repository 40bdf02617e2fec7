/// Draw and compute work handed to a render target, and its translation
/// into commands
///
/// `record_draw_item` and `record_compute_call` are the only places where
/// draw data becomes commands. The sequential path and the recording
/// workers both go through them, so both produce the same command stream.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, CommandBuffer, DepthBias, DynamicStateFlags, Extent2D, IndexType, Rect2D,
    ResourcePackage, Viewport,
};
use crate::pipeline::{ComputePipeline, GraphicsPipeline};
use crate::target::RenderTargetId;

/// Geometry range of one draw call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawRange {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    /// Ignored when the item has no index buffer
    pub index_count: u32,
}

/// Per-draw dynamic state
///
/// Each state is recorded only when its flag is set here and the pipeline
/// declares it dynamic.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicStateContainer {
    flags: DynamicStateFlags,
    viewport: Viewport,
    scissor: Rect2D,
    line_width: f32,
    depth_bias: DepthBias,
    blend_constants: [f32; 4],
    depth_bounds: (f32, f32),
    push_constants: Vec<u8>,
}

impl Default for DynamicStateContainer {
    fn default() -> Self {
        Self {
            flags: DynamicStateFlags::empty(),
            viewport: Viewport { x: 0.0, y: 0.0, width: 0.0, height: 0.0, min_depth: 0.0, max_depth: 1.0 },
            scissor: Rect2D { x: 0, y: 0, width: 0, height: 0 },
            line_width: 1.0,
            depth_bias: DepthBias { constant_factor: 0.0, clamp: 0.0, slope_factor: 0.0 },
            blend_constants: [0.0; 4],
            depth_bounds: (0.0, 1.0),
            push_constants: Vec::new(),
        }
    }
}

impl DynamicStateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// States set on this container
    pub fn flags(&self) -> DynamicStateFlags {
        self.flags
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> &mut Self {
        self.viewport = viewport;
        self.flags |= DynamicStateFlags::VIEWPORT;
        self
    }

    pub fn set_scissor(&mut self, scissor: Rect2D) -> &mut Self {
        self.scissor = scissor;
        self.flags |= DynamicStateFlags::SCISSOR;
        self
    }

    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.line_width = width;
        self.flags |= DynamicStateFlags::LINE_WIDTH;
        self
    }

    pub fn set_depth_bias(&mut self, bias: DepthBias) -> &mut Self {
        self.depth_bias = bias;
        self.flags |= DynamicStateFlags::DEPTH_BIAS;
        self
    }

    pub fn set_blend_constants(&mut self, constants: [f32; 4]) -> &mut Self {
        self.blend_constants = constants;
        self.flags |= DynamicStateFlags::BLEND_CONSTANTS;
        self
    }

    pub fn set_depth_bounds(&mut self, min: f32, max: f32) -> &mut Self {
        self.depth_bounds = (min, max);
        self.flags |= DynamicStateFlags::DEPTH_BOUNDS;
        self
    }

    /// Raw push constant bytes, pushed at the start of the pipeline's range
    pub fn set_push_constant_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.push_constants = data.to_vec();
        self.flags |= DynamicStateFlags::PUSH_CONSTANTS;
        self
    }

    /// Push constants from any plain-old-data value (e.g. a `glam::Mat4`)
    pub fn set_push_constants<T: bytemuck::Pod>(&mut self, value: &T) -> &mut Self {
        self.set_push_constant_bytes(bytemuck::bytes_of(value))
    }

    /// Clear one or more states
    pub fn unset(&mut self, flags: DynamicStateFlags) -> &mut Self {
        self.flags.remove(flags);
        if flags.contains(DynamicStateFlags::PUSH_CONSTANTS) {
            self.push_constants.clear();
        }
        self
    }
}

/// One draw call with everything it binds
#[derive(Clone)]
pub struct DrawItem {
    /// Must have been built for the render target that records the item
    pub pipeline: Arc<GraphicsPipeline>,
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Option<(Arc<dyn Buffer>, IndexType)>,
    /// Bound at their own set index
    pub resource_packages: Vec<Arc<dyn ResourcePackage>>,
    pub dynamic_state: DynamicStateContainer,
    pub range: DrawRange,
}

/// Ordered list of draw items
#[derive(Clone, Default)]
pub struct DrawBatch {
    pub items: Vec<DrawItem>,
}

impl DrawBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<DrawItem>> for DrawBatch {
    fn from(items: Vec<DrawItem>) -> Self {
        Self { items }
    }
}

/// One compute dispatch
#[derive(Clone)]
pub struct ComputeCall {
    pub pipeline: Arc<ComputePipeline>,
    pub resource_packages: Vec<Arc<dyn ResourcePackage>>,
    /// Empty for none
    pub push_constants: Vec<u8>,
    pub group_counts: [u32; 3],
}

/// Record one draw item
///
/// # Arguments
///
/// * `cmd` - Primary or secondary buffer inside the target's render pass
/// * `item` - Draw to record
/// * `target` - Render target being recorded
/// * `extent` - Render area, used for viewport/scissor the item leaves unset
pub fn record_draw_item(
    cmd: &mut dyn CommandBuffer,
    item: &DrawItem,
    target: RenderTargetId,
    extent: Extent2D,
) -> Result<()> {
    debug_assert_eq!(
        item.pipeline.target_id(),
        target,
        "pipeline '{}' was built for another render target",
        item.pipeline.name()
    );

    let handle = item.pipeline.handle();
    let desc = item.pipeline.desc();
    cmd.bind_graphics_pipeline(handle.as_ref())?;

    for package in &item.resource_packages {
        cmd.bind_resource_package(handle.as_ref(), package.set(), package.as_ref())?;
    }

    // Dynamic state
    let declared = desc.dynamic_states;
    let state = &item.dynamic_state;
    if declared.contains(DynamicStateFlags::VIEWPORT) {
        let viewport = if state.flags.contains(DynamicStateFlags::VIEWPORT) {
            state.viewport
        } else {
            Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }
        };
        cmd.set_viewport(viewport)?;
    }
    if declared.contains(DynamicStateFlags::SCISSOR) {
        let scissor = if state.flags.contains(DynamicStateFlags::SCISSOR) {
            state.scissor
        } else {
            Rect2D { x: 0, y: 0, width: extent.width, height: extent.height }
        };
        cmd.set_scissor(scissor)?;
    }

    let active = declared & state.flags;
    if active.contains(DynamicStateFlags::LINE_WIDTH) {
        cmd.set_line_width(state.line_width)?;
    }
    if active.contains(DynamicStateFlags::DEPTH_BIAS) {
        cmd.set_depth_bias(state.depth_bias)?;
    }
    if active.contains(DynamicStateFlags::BLEND_CONSTANTS) {
        cmd.set_blend_constants(state.blend_constants)?;
    }
    if active.contains(DynamicStateFlags::DEPTH_BOUNDS) {
        cmd.set_depth_bounds(state.depth_bounds.0, state.depth_bounds.1)?;
    }
    if let Some(range) = desc.push_constants {
        if state.flags.contains(DynamicStateFlags::PUSH_CONSTANTS) && !state.push_constants.is_empty() {
            cmd.push_constants(handle.as_ref(), range.stages, range.offset, &state.push_constants)?;
        }
    }

    // Geometry
    cmd.bind_vertex_buffer(item.vertex_buffer.as_ref(), 0)?;
    match &item.index_buffer {
        Some((buffer, index_type)) => {
            cmd.bind_index_buffer(buffer.as_ref(), 0, *index_type)?;
            cmd.draw_indexed(
                item.range.index_count,
                item.range.index_offset,
                item.range.vertex_offset as i32,
            )
        }
        None => cmd.draw(item.range.vertex_count, item.range.vertex_offset),
    }
}

/// Record one compute dispatch (outside any render pass)
pub fn record_compute_call(cmd: &mut dyn CommandBuffer, call: &ComputeCall) -> Result<()> {
    let handle = call.pipeline.handle();
    cmd.bind_compute_pipeline(handle.as_ref())?;

    for package in &call.resource_packages {
        cmd.bind_resource_package(handle.as_ref(), package.set(), package.as_ref())?;
    }

    if let Some(range) = call.pipeline.desc().push_constants {
        if !call.push_constants.is_empty() {
            cmd.push_constants(handle.as_ref(), range.stages, range.offset, &call.push_constants)?;
        }
    }

    cmd.dispatch(call.group_counts)
}

#[cfg(test)]
#[path = "draw_tests.rs"]
mod tests;
