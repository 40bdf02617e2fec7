/// CommandBuffer - Vulkan implementation of the CommandPool and CommandBuffer traits
///
/// A pool hands out primary or secondary buffers for one queue family. The
/// VkCommandPool is shared by the pool and every buffer it allocated, and is
/// destroyed (freeing its buffers) when the last of them is dropped.

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{
    Buffer, ClearValue, CommandBuffer, CommandBufferLevel, CommandPool, DepthBias, Framebuffer,
    Image, ImageLayout, IndexType, InheritanceInfo, PipelineBindPoint, PipelineObject, QueueKind,
    Rect2D, RenderPass, ResourcePackage, ShaderStageFlags, SubpassContents, Viewport,
};
use flint_3d_engine::engine_error;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::{downcast, vk_creation_error, vk_error, GpuContext};
use crate::vulkan_format::{
    clear_value_to_vk, image_layout_to_vk, index_type_to_vk, layout_access_and_stage,
    shader_stages_to_vk,
};
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_pipeline::{VulkanPipeline, VulkanResourcePackage};
use crate::vulkan_render_pass::VulkanRenderPass;

const SOURCE: &str = "flint3d::vulkan";

/// VkCommandPool shared by a pool and its buffers
struct PoolHandle {
    ctx: Arc<GpuContext>,
    pool: vk::CommandPool,
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Vulkan command pool implementation
pub struct VulkanCommandPool {
    handle: Arc<PoolHandle>,
    queue: QueueKind,
}

impl VulkanCommandPool {
    pub(crate) fn new(ctx: Arc<GpuContext>, queue: QueueKind) -> Result<Self> {
        let family = ctx.queues.get(queue).family;

        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { ctx.device.create_command_pool(&create_info, None) }
            .map_err(|e| vk_creation_error("Failed to create command pool", e))?;

        Ok(Self {
            handle: Arc::new(PoolHandle { ctx, pool }),
            queue,
        })
    }

    /// Queue the allocated buffers are submitted to
    pub fn queue(&self) -> QueueKind {
        self.queue
    }
}

impl CommandPool for VulkanCommandPool {
    fn allocate(&mut self, level: CommandBufferLevel, count: u32) -> Result<Vec<Box<dyn CommandBuffer>>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let vk_level = match level {
            CommandBufferLevel::Primary => vk::CommandBufferLevel::PRIMARY,
            CommandBufferLevel::Secondary => vk::CommandBufferLevel::SECONDARY,
        };

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.handle.pool)
            .level(vk_level)
            .command_buffer_count(count);

        let command_buffers = unsafe { self.handle.ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_creation_error(&format!("Failed to allocate {} command buffers", count), e))?;

        Ok(command_buffers
            .into_iter()
            .map(|command_buffer| Box::new(VulkanCommandBuffer {
                pool: Arc::clone(&self.handle),
                command_buffer,
                level,
                is_recording: false,
                in_render_pass: false,
            }) as Box<dyn CommandBuffer>)
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Vulkan command buffer implementation
///
/// Records rendering commands for later submission to the GPU. Freed with
/// its pool.
pub struct VulkanCommandBuffer {
    pool: Arc<PoolHandle>,
    /// Command buffer for recording
    pub(crate) command_buffer: vk::CommandBuffer,
    level: CommandBufferLevel,
    /// Whether the command buffer is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass (always true for a recording secondary)
    in_render_pass: bool,
}

impl VulkanCommandBuffer {
    fn device(&self) -> &ash::Device {
        &self.pool.ctx.device
    }

    fn ensure_recording(&self, what: &str) -> Result<()> {
        if !self.is_recording {
            engine_error!(SOURCE, "{}: command buffer is not recording", what);
            return Err(Error::BackendError(format!("{}: command buffer is not recording", what)));
        }
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.device()
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error("Failed to reset command buffer", e))
        }
    }
}

impl CommandBuffer for VulkanCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        if self.level != CommandBufferLevel::Primary {
            engine_error!(SOURCE, "begin() called on a secondary command buffer");
            return Err(Error::BackendError("begin() requires a primary command buffer".to_string()));
        }

        self.reset()?;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe { self.device().begin_command_buffer(self.command_buffer, &begin_info) }
            .map_err(|e| vk_error("Failed to begin command buffer", e))?;

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn begin_secondary(&mut self, inheritance: &InheritanceInfo) -> Result<()> {
        if self.level != CommandBufferLevel::Secondary {
            engine_error!(SOURCE, "begin_secondary() called on a primary command buffer");
            return Err(Error::BackendError("begin_secondary() requires a secondary command buffer".to_string()));
        }

        let render_pass = downcast::<VulkanRenderPass>(inheritance.render_pass.as_any(), "Render pass")?;
        let framebuffer = downcast::<VulkanFramebuffer>(inheritance.framebuffer.as_any(), "Framebuffer")?;

        self.reset()?;

        let inheritance_info = vk::CommandBufferInheritanceInfo::default()
            .render_pass(render_pass.render_pass)
            .subpass(inheritance.subpass)
            .framebuffer(framebuffer.framebuffer);

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
                | vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
            .inheritance_info(&inheritance_info);

        unsafe { self.device().begin_command_buffer(self.command_buffer, &begin_info) }
            .map_err(|e| vk_error("Failed to begin secondary command buffer", e))?;

        self.is_recording = true;
        self.in_render_pass = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_recording("end")?;

        if self.in_render_pass && self.level == CommandBufferLevel::Primary {
            engine_error!(SOURCE, "end() called inside a render pass");
            return Err(Error::BackendError("Cannot end command buffer inside a render pass".to_string()));
        }

        unsafe { self.device().end_command_buffer(self.command_buffer) }
            .map_err(|e| vk_error("Failed to end command buffer", e))?;

        self.is_recording = false;
        self.in_render_pass = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        render_area: Rect2D,
        clear_values: &[ClearValue],
        contents: SubpassContents,
    ) -> Result<()> {
        self.ensure_recording("begin_render_pass")?;

        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let render_pass = downcast::<VulkanRenderPass>(render_pass.as_any(), "Render pass")?;
        let framebuffer = downcast::<VulkanFramebuffer>(framebuffer.as_any(), "Framebuffer")?;

        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass.render_pass)
            .framebuffer(framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: render_area.x, y: render_area.y },
                extent: vk::Extent2D { width: render_area.width, height: render_area.height },
            })
            .clear_values(&vk_clear_values);

        let vk_contents = match contents {
            SubpassContents::Inline => vk::SubpassContents::INLINE,
            SubpassContents::SecondaryCommandBuffers => vk::SubpassContents::SECONDARY_COMMAND_BUFFERS,
        };

        unsafe {
            self.device().cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk_contents);
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_recording("end_render_pass")?;

        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }

        unsafe {
            self.device().cmd_end_render_pass(self.command_buffer);
        }

        self.in_render_pass = false;
        Ok(())
    }

    fn execute_secondary(&mut self, buffers: &[&dyn CommandBuffer]) -> Result<()> {
        self.ensure_recording("execute_secondary")?;

        if buffers.is_empty() {
            return Ok(());
        }

        let handles = buffers
            .iter()
            .map(|buffer| downcast::<VulkanCommandBuffer>(buffer.as_any(), "Secondary command buffer")
                .map(|buffer| buffer.command_buffer))
            .collect::<Result<Vec<_>>>()?;

        unsafe {
            self.device().cmd_execute_commands(self.command_buffer, &handles);
        }
        Ok(())
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()> {
        self.ensure_recording("bind_graphics_pipeline")?;
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "Pipeline")?;

        if pipeline.bind_point() != PipelineBindPoint::Graphics {
            return Err(Error::InvalidResource("Cannot bind a compute pipeline as graphics".to_string()));
        }

        unsafe {
            self.device().cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
        }
        Ok(())
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()> {
        self.ensure_recording("bind_compute_pipeline")?;
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "Pipeline")?;

        if pipeline.bind_point() != PipelineBindPoint::Compute {
            return Err(Error::InvalidResource("Cannot bind a graphics pipeline as compute".to_string()));
        }

        unsafe {
            self.device().cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::COMPUTE, pipeline.pipeline);
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, offset: u64) -> Result<()> {
        self.ensure_recording("bind_vertex_buffer")?;
        let buffer = downcast::<VulkanBuffer>(buffer.as_any(), "Vertex buffer")?;

        unsafe {
            self.device().cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording("bind_index_buffer")?;
        let buffer = downcast::<VulkanBuffer>(buffer.as_any(), "Index buffer")?;

        unsafe {
            self.device().cmd_bind_index_buffer(
                self.command_buffer,
                buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn bind_resource_package(
        &mut self,
        pipeline: &dyn PipelineObject,
        set: u32,
        package: &dyn ResourcePackage,
    ) -> Result<()> {
        self.ensure_recording("bind_resource_package")?;
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "Pipeline")?;
        let package = downcast::<VulkanResourcePackage>(package.as_any(), "Resource package")?;

        if package.set() != set {
            engine_error!(SOURCE, "Resource package built for set {} bound at set {}", package.set(), set);
            return Err(Error::InvalidResource(format!(
                "Resource package built for set {} bound at set {}",
                package.set(),
                set
            )));
        }

        let bind_point = match pipeline.bind_point() {
            PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        };

        unsafe {
            self.device().cmd_bind_descriptor_sets(
                self.command_buffer,
                bind_point,
                pipeline.layout,
                set,
                &[package.descriptor_set],
                &[], // dynamic_offsets
            );
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording("set_viewport")?;

        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };

        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording("set_scissor")?;

        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };

        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn set_line_width(&mut self, width: f32) -> Result<()> {
        self.ensure_recording("set_line_width")?;
        unsafe {
            self.device().cmd_set_line_width(self.command_buffer, width);
        }
        Ok(())
    }

    fn set_depth_bias(&mut self, bias: DepthBias) -> Result<()> {
        self.ensure_recording("set_depth_bias")?;
        unsafe {
            self.device().cmd_set_depth_bias(
                self.command_buffer,
                bias.constant_factor,
                bias.clamp,
                bias.slope_factor,
            );
        }
        Ok(())
    }

    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()> {
        self.ensure_recording("set_blend_constants")?;
        unsafe {
            self.device().cmd_set_blend_constants(self.command_buffer, &constants);
        }
        Ok(())
    }

    fn set_depth_bounds(&mut self, min: f32, max: f32) -> Result<()> {
        self.ensure_recording("set_depth_bounds")?;
        unsafe {
            self.device().cmd_set_depth_bounds(self.command_buffer, min, max);
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        pipeline: &dyn PipelineObject,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_recording("push_constants")?;
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "Pipeline")?;

        unsafe {
            self.device().cmd_push_constants(
                self.command_buffer,
                pipeline.layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_recording("draw")?;

        if !self.in_render_pass {
            return Err(Error::BackendError("draw() must be called inside a render pass".to_string()));
        }

        unsafe {
            self.device().cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_recording("draw_indexed")?;

        if !self.in_render_pass {
            return Err(Error::BackendError("draw_indexed() must be called inside a render pass".to_string()));
        }

        unsafe {
            self.device().cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn dispatch(&mut self, group_counts: [u32; 3]) -> Result<()> {
        self.ensure_recording("dispatch")?;

        if self.in_render_pass {
            return Err(Error::BackendError("dispatch() cannot be called inside a render pass".to_string()));
        }

        let [x, y, z] = group_counts;
        unsafe {
            self.device().cmd_dispatch(self.command_buffer, x, y, z);
        }
        Ok(())
    }

    fn image_barrier(&mut self, image: &dyn Image, old_layout: ImageLayout, new_layout: ImageLayout) -> Result<()> {
        self.ensure_recording("image_barrier")?;

        if self.in_render_pass {
            return Err(Error::BackendError("image_barrier() cannot be called inside a render pass".to_string()));
        }

        let image = downcast::<VulkanImage>(image.as_any(), "Image")?;
        record_layout_transition(self.device(), self.command_buffer, &[image], old_layout, new_layout);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Record one pipeline barrier transitioning every image between two layouts
pub(crate) fn record_layout_transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    images: &[&VulkanImage],
    old_layout: ImageLayout,
    new_layout: ImageLayout,
) {
    let (src_access, src_stage) = layout_access_and_stage(old_layout);
    let (dst_access, dst_stage) = layout_access_and_stage(new_layout);

    let barriers: Vec<vk::ImageMemoryBarrier> = images
        .iter()
        .map(|image| {
            vk::ImageMemoryBarrier::default()
                .old_layout(image_layout_to_vk(old_layout))
                .new_layout(image_layout_to_vk(new_layout))
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image.image)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: image.aspect,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .src_access_mask(src_access)
                .dst_access_mask(dst_access)
        })
        .collect();

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &barriers,
        );
    }
}
