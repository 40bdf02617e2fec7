/// Command pools and command buffers - for recording GPU commands

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, ClearValue, Framebuffer, Image, ImageLayout, IndexType, PipelineObject,
    RenderPass, ResourcePackage, ShaderStageFlags,
};

/// Primary buffers are submitted; secondary buffers are executed by a primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferLevel {
    Primary,
    Secondary,
}

/// How the commands of a render pass are provided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassContents {
    /// Recorded directly in the primary buffer
    Inline,
    /// Provided only by `execute_secondary`
    SecondaryCommandBuffers,
}

/// Render pass state a secondary command buffer continues
///
/// Must match exactly the render pass, framebuffer and subpass of the
/// primary buffer that executes the secondary.
#[derive(Clone)]
pub struct InheritanceInfo {
    pub render_pass: Arc<dyn RenderPass>,
    pub framebuffer: Arc<dyn Framebuffer>,
    pub subpass: u32,
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Depth bias parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    /// Constant depth offset
    pub constant_factor: f32,
    /// Maximum depth bias clamp
    pub clamp: f32,
    /// Slope-based depth offset
    pub slope_factor: f32,
}

/// Allocator of command buffers
///
/// Pools are externally synchronized: a pool and the buffers allocated from
/// it are used from one thread at a time.
pub trait CommandPool: Send {
    /// Allocate `count` command buffers of the given level
    fn allocate(&mut self, level: CommandBufferLevel, count: u32) -> Result<Vec<Box<dyn CommandBuffer>>>;

    fn as_any(&self) -> &dyn Any;
}

/// Command buffer for recording rendering commands
///
/// Commands are recorded and later submitted to the GPU via `GraphicsDevice::submit()`
/// (primary) or executed by a primary buffer (secondary).
pub trait CommandBuffer: Send {
    /// Reset and begin recording a primary buffer (one-time submit)
    fn begin(&mut self) -> Result<()>;

    /// Reset and begin recording a secondary buffer that continues a render pass
    fn begin_secondary(&mut self, inheritance: &InheritanceInfo) -> Result<()>;

    /// End recording
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer holding the attachments
    /// * `render_area` - Area affected by the render pass
    /// * `clear_values` - One per attachment, in attachment order
    /// * `contents` - Inline commands or secondary command buffers only
    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        render_area: Rect2D,
        clear_values: &[ClearValue],
        contents: SubpassContents,
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Execute recorded secondary command buffers (inside a render pass begun
    /// with `SubpassContents::SecondaryCommandBuffers`)
    fn execute_secondary(&mut self, buffers: &[&dyn CommandBuffer]) -> Result<()>;

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()>;

    fn bind_compute_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()>;

    /// Bind a resource package at its set index, using the pipeline's layout
    fn bind_resource_package(
        &mut self,
        pipeline: &dyn PipelineObject,
        set: u32,
        package: &dyn ResourcePackage,
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    fn set_line_width(&mut self, width: f32) -> Result<()>;

    fn set_depth_bias(&mut self, bias: DepthBias) -> Result<()>;

    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()>;

    fn set_depth_bounds(&mut self, min: f32, max: f32) -> Result<()>;

    /// Push constants to the pipeline
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout declares the range
    /// * `stages` - Shader stages that will access the push constants
    /// * `offset` - Offset in bytes into push constant range
    /// * `data` - Data to push
    fn push_constants(
        &mut self,
        pipeline: &dyn PipelineObject,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Draw vertices
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Dispatch compute work groups
    fn dispatch(&mut self, group_counts: [u32; 3]) -> Result<()>;

    /// Record a layout transition barrier for an image (outside render passes)
    fn image_barrier(&mut self, image: &dyn Image, old_layout: ImageLayout, new_layout: ImageLayout) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
