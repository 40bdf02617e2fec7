/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer over attachment image views. Created once per
/// swapchain image (or frame slot), recreated with the attachments.

use flint_3d_engine::flint3d::Result;
use flint_3d_engine::flint3d::render::{Extent2D, Framebuffer, FramebufferDesc};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{downcast, vk_creation_error, GpuContext};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_render_pass::VulkanRenderPass;

/// Vulkan framebuffer implementation
///
/// Wraps a VkFramebuffer. Destroyed when dropped.
pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    extent: Extent2D,
}

impl VulkanFramebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        let render_pass = downcast::<VulkanRenderPass>(desc.render_pass.as_any(), "Render pass")?;

        let attachments = desc.attachments
            .iter()
            .map(|image| downcast::<VulkanImage>(image.as_any(), "Framebuffer attachment").map(|image| image.view))
            .collect::<Result<Vec<vk::ImageView>>>()?;

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(1);

        let framebuffer = unsafe { ctx.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| vk_creation_error("Failed to create framebuffer", e))?;

        Ok(Self {
            ctx,
            framebuffer,
            extent: desc.extent,
        })
    }
}

impl Framebuffer for VulkanFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
