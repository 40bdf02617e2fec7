/// Framebuffer trait - groups render target attachments for a render pass
///
/// A framebuffer binds together the images a render pass will render into.
/// Created once per swapchain image (or per frame slot off-screen) and
/// recreated only when attachments change.

use std::any::Any;
use crate::graphics_device::{Extent2D, Image, RenderPass};

/// Framebuffer, compatible with the render pass it was created for
pub trait Framebuffer: Send + Sync {
    /// Size in pixels
    fn extent(&self) -> Extent2D;

    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a dyn RenderPass,
    /// Images in render pass attachment order
    pub attachments: Vec<&'a dyn Image>,
    /// Size in pixels
    pub extent: Extent2D,
}
