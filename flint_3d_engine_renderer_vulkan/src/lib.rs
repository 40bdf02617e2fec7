/*!
# Flint 3D Engine - Vulkan Backend

Vulkan implementation of the flint_3d_engine `GraphicsDevice` seam.

Render targets, frame synchronization and command recording live in the
engine crate; this crate provides the device objects they drive, using Ash
for the Vulkan bindings and gpu-allocator for memory management.

```no_run
use flint_3d_engine::flint3d::render::Config;
use flint_3d_engine_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> flint_3d_engine::flint3d::Result<()> {
let device = VulkanGraphicsDevice::new(window, Config::default())?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_image;
mod vulkan_sync;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_command_buffer;
mod vulkan_buffer;
mod vulkan_pipeline;
mod debug;

pub use vulkan::VulkanGraphicsDevice;
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_command_buffer::{VulkanCommandBuffer, VulkanCommandPool};
pub use vulkan_frame_buffer::VulkanFramebuffer;
pub use vulkan_image::VulkanImage;
pub use vulkan_pipeline::{VulkanPipeline, VulkanPipelineCache, VulkanResourcePackage};
pub use vulkan_render_pass::VulkanRenderPass;
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_sync::{VulkanFence, VulkanSemaphore};

