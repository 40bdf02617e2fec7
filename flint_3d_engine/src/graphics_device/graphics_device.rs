/// GraphicsDevice trait - main device factory interface

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, CommandBuffer, CommandPool, ComputePipelineCreateInfo, Config, Fence,
    Framebuffer, FramebufferDesc, GpuSemaphore, GraphicsPipelineCreateInfo, Image, ImageDesc,
    ImageLayout, PipelineCache, PipelineObject, PipelineStageFlags, PresentRequest, PresentStatus,
    RenderPass, RenderPassDesc, ResourceBinding, ResourcePackage, SampleCount, Swapchain,
    SwapchainDesc, TextureFormat,
};

/// Device queue families
///
/// Compute and transfer may alias the graphics queue when the hardware has
/// no dedicated family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Compute,
    Transfer,
}

/// One queue submission
pub struct SubmitInfo<'a> {
    pub queue: QueueKind,
    pub command_buffers: &'a [&'a dyn CommandBuffer],
    /// Semaphores to wait on, each with the stage that waits
    pub wait_semaphores: &'a [(&'a dyn GpuSemaphore, PipelineStageFlags)],
    pub signal_semaphores: &'a [&'a dyn GpuSemaphore],
    /// Fence signaled once every command buffer has completed
    pub fence: Option<&'a dyn Fence>,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Main device trait
///
/// This is the central factory interface for creating GPU objects and the
/// only path to the device queues. Owns the queues, the memory allocator and
/// the presentation surface; must outlive every object it creates.
///
/// `submit()` and `present()` are serialized internally, so render targets on
/// different threads may share one device.
pub trait GraphicsDevice: Send + Sync {
    /// Device configuration
    fn config(&self) -> &Config;

    /// Highest sample count usable for both color and depth attachments
    fn max_sample_count(&self) -> SampleCount;

    /// First supported depth attachment format among `DEPTH_FORMAT_CANDIDATES`
    fn find_depth_format(&self) -> Result<TextureFormat>;

    /// Create an attachment image with its view
    ///
    /// The image starts in `ImageLayout::Undefined`.
    ///
    /// # Errors
    ///
    /// `Error::ResourceCreationFailed` for unsupported format/sample-count
    /// combinations, `Error::OutOfMemory` when memory is exhausted.
    fn create_attachment_image(&self, desc: &ImageDesc) -> Result<Box<dyn Image>>;

    /// Transition images between layouts with a one-time command buffer on
    /// the graphics queue, blocking until it completes
    fn transition_image_layouts(
        &self,
        images: &[&dyn Image],
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()>;

    /// Create a swapchain on the device's presentation surface
    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Box<dyn GpuSemaphore>>;

    /// Create a command pool whose buffers are submitted to `queue`
    fn create_command_pool(&self, queue: QueueKind) -> Result<Box<dyn CommandPool>>;

    /// Create a host-visible buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a pipeline cache seeded with previously saved data
    ///
    /// Data the driver rejects must yield an empty cache, not an error.
    fn create_pipeline_cache(&self, initial_data: &[u8]) -> Result<Box<dyn PipelineCache>>;

    fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Arc<dyn PipelineObject>>;

    fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Arc<dyn PipelineObject>>;

    /// Create a resource package for one set index of a pipeline's layout
    fn create_resource_package(
        &self,
        pipeline: &dyn PipelineObject,
        set: u32,
        bindings: &[ResourceBinding],
    ) -> Result<Arc<dyn ResourcePackage>>;

    /// Submit command buffers to a queue
    fn submit(&self, info: &SubmitInfo) -> Result<()>;

    /// Present a swapchain image on the graphics queue
    ///
    /// Out of date and suboptimal are reported as `PresentStatus`, never as errors.
    fn present(&self, request: &PresentRequest) -> Result<PresentStatus>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;
}
