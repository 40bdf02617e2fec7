/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Manages presentation images on the device's surface. Image acquisition
/// reports out-of-date and suboptimal as statuses; presentation itself is a
/// queue operation done by the device.

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{
    choose_composite_alpha, choose_extent, choose_image_count, choose_present_mode,
    choose_surface_format, AcquireStatus, Extent2D, GpuSemaphore, Image, PresentRequest,
    SurfaceFormat, Swapchain, SwapchainDesc, TextureFormat,
};
use flint_3d_engine::{engine_debug, engine_error, engine_info};
use ash::vk;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_context::{downcast, vk_creation_error, vk_error, GpuContext};
use crate::vulkan_format::{
    color_space_to_vk, composite_alpha_to_vk, extent_to_vk, format_to_vk, present_mode_from_vk,
    present_mode_to_vk, surface_capabilities_from_vk, surface_format_from_vk,
};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_sync::VulkanSemaphore;

const SOURCE: &str = "flint3d::vulkan";

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) swapchain: vk::SwapchainKHR,
    /// Swapchain images with their views
    images: Vec<VulkanImage>,
    surface_format: SurfaceFormat,
    extent: Extent2D,
    /// Frame buffering factor requested at creation
    buffer_count: u32,
}

impl VulkanSwapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &SwapchainDesc) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        // Choose surface format once; recreation keeps it
        let surface_formats = unsafe {
            ctx.surface_loader.get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
        }
        .map_err(|e| vk_error("Failed to query surface formats", e))?;

        let available: Vec<SurfaceFormat> = surface_formats
            .into_iter()
            .filter_map(surface_format_from_vk)
            .collect();
        let surface_format = choose_surface_format(&available)?;

        let mut swapchain = Self {
            ctx,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            surface_format,
            extent: Extent2D::default(),
            buffer_count: desc.buffer_count,
        };
        swapchain.build(desc.extent)?;

        engine_info!(SOURCE, "Swapchain created: {} images, {}, {:?}",
            swapchain.images.len(), swapchain.extent, swapchain.surface_format.format);

        Ok(swapchain)
    }

    /// Create the VkSwapchainKHR (retiring the current one) and its image views
    fn build(&mut self, requested: Extent2D) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);

        unsafe {
            let capabilities = ctx.surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
                .map_err(|e| vk_error("Failed to get surface capabilities", e))?;

            let present_modes: Vec<_> = ctx.surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, ctx.surface)
                .map_err(|e| vk_error("Failed to query present modes", e))?
                .into_iter()
                .filter_map(present_mode_from_vk)
                .collect();

            let caps = surface_capabilities_from_vk(&capabilities);
            let extent = choose_extent(&caps, requested);
            if extent.is_zero() {
                engine_error!(SOURCE, "Cannot create a swapchain with an empty extent {}", extent);
                return Err(Error::InvalidResource(format!(
                    "Cannot create a swapchain with an empty extent {}",
                    extent
                )));
            }
            let image_count = choose_image_count(&caps, self.buffer_count);
            let present_mode = choose_present_mode(&present_modes);
            let composite_alpha = choose_composite_alpha(caps.supported_composite_alpha);

            // Share images with the transfer queue when it lives in another family
            let graphics_family = ctx.queues.graphics.family;
            let transfer_family = ctx.queues.transfer.family;
            let queue_family_indices = [graphics_family, transfer_family];

            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(ctx.surface)
                .min_image_count(image_count)
                .image_format(format_to_vk(self.surface_format.format))
                .image_color_space(color_space_to_vk(self.surface_format.color_space))
                .image_extent(extent_to_vk(extent))
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(composite_alpha_to_vk(composite_alpha))
                .present_mode(present_mode_to_vk(present_mode))
                .clipped(true)
                .old_swapchain(self.swapchain);

            create_info = if graphics_family != transfer_family {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| vk_creation_error("Failed to create swapchain", e))?;

            // Retire the old swapchain and its views
            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;

            let images = self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| vk_error("Failed to get swapchain images", e))?;

            self.images = images
                .into_iter()
                .map(|image| VulkanImage::new_swapchain_image(
                    Arc::clone(&ctx),
                    image,
                    extent,
                    self.surface_format.format,
                ))
                .collect::<Result<Vec<_>>>()?;

            engine_debug!(SOURCE, "Swapchain built: {} images, {}, {:?}", self.images.len(), extent, present_mode);

            Ok(())
        }
    }
}

impl Swapchain for VulkanSwapchain {
    fn resolve_extent(&self, requested: Extent2D) -> Result<Extent2D> {
        let capabilities = unsafe {
            self.ctx.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.ctx.surface)
        }
        .map_err(|e| vk_error("Failed to get surface capabilities", e))?;

        Ok(choose_extent(&surface_capabilities_from_vk(&capabilities), requested))
    }

    fn acquire_next_image(&mut self, signal: &dyn GpuSemaphore, timeout: Duration) -> Result<AcquireStatus> {
        let semaphore = downcast::<VulkanSemaphore>(signal.as_any(), "Semaphore")?;
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore.semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquireStatus::Acquired { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireStatus::OutOfDate),
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                engine_error!(SOURCE, "Swapchain image acquisition timed out after {:?}", timeout);
                Err(Error::DeviceLost(format!("Swapchain image acquisition timed out after {:?}", timeout)))
            }
            Err(e) => Err(vk_error("Failed to acquire next swapchain image", e)),
        }
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        self.build(extent)?;
        engine_info!(SOURCE, "Swapchain recreated at {}", self.extent);
        Ok(())
    }

    fn prepare_to_present<'a>(&'a self, image_index: u32, wait_semaphore: &'a dyn GpuSemaphore) -> PresentRequest<'a> {
        PresentRequest {
            swapchain: self,
            image_index,
            wait_semaphore,
        }
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<&dyn Image> {
        self.images.get(index).map(|image| image as &dyn Image)
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.surface_format.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        // Image views first, then the swapchain that owns the images
        self.images.clear();
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
