/// Swapchain trait - for window presentation

use std::any::Any;
use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{Extent2D, GpuSemaphore, Image, TextureFormat};

/// Descriptor for creating a swapchain on the device's surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Requested extent (the surface may override it)
    pub extent: Extent2D,
    /// Frame buffering factor; the swapchain holds at least this many images
    pub buffer_count: u32,
}

/// Result of `Swapchain::acquire_next_image`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// An image was acquired. `suboptimal` means it is still usable but the
    /// swapchain no longer matches the surface exactly.
    Acquired { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface and must be recreated
    OutOfDate,
}

/// Result of a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Presentation request built by `Swapchain::prepare_to_present`
///
/// Presenting is a queue operation performed through
/// `GraphicsDevice::present()`.
pub struct PresentRequest<'a> {
    pub swapchain: &'a dyn Swapchain,
    pub image_index: u32,
    /// Semaphore signaled when rendering to the image has finished
    pub wait_semaphore: &'a dyn GpuSemaphore,
}

/// Swapchain for presenting rendered images to a window
///
/// The image index returned by acquisition is independent from any frame
/// slot counter; images may be handed out in any order.
pub trait Swapchain: Send + Sync {
    /// Extent the swapchain would use for a requested extent, given the
    /// current surface capabilities
    fn resolve_extent(&self, requested: Extent2D) -> Result<Extent2D>;

    /// Acquire the next presentable image
    ///
    /// # Arguments
    ///
    /// * `signal` - Semaphore signaled when the image is safe to write
    /// * `timeout` - Upper bound on the wait for an image
    ///
    /// # Errors
    ///
    /// `Error::SurfaceLost` when the surface is gone, `Error::DeviceLost`
    /// when the device is lost or the timeout expires.
    fn acquire_next_image(
        &mut self,
        signal: &dyn GpuSemaphore,
        timeout: Duration,
    ) -> Result<AcquireStatus>;

    /// Recreate the swapchain and its image views against the current
    /// surface capabilities (the surface itself is kept)
    fn recreate(&mut self, extent: Extent2D) -> Result<()>;

    /// Build the present request for an image
    fn prepare_to_present<'a>(
        &'a self,
        image_index: u32,
        wait_semaphore: &'a dyn GpuSemaphore,
    ) -> PresentRequest<'a>;

    /// Number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Swapchain image by index
    fn image(&self, index: usize) -> Option<&dyn Image>;

    /// Current extent of the swapchain images
    fn extent(&self) -> Extent2D;

    /// Pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    fn as_any(&self) -> &dyn Any;
}
