/// Image - Vulkan implementation of the Image trait
///
/// Attachment images own their memory. Swapchain images only own their view;
/// the VkImage belongs to the swapchain.

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{Extent2D, Image, ImageDesc, SampleCount, TextureFormat};
use flint_3d_engine::engine_error;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{vk_creation_error, GpuContext};
use crate::vulkan_format::{aspect_for_format, format_to_vk, image_usage_to_vk, sample_count_to_vk};

const SOURCE: &str = "flint3d::vulkan";

/// Vulkan image with its default view
pub struct VulkanImage {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) aspect: vk::ImageAspectFlags,
    /// `None` for swapchain images
    allocation: Option<Allocation>,
    owns_image: bool,
    extent: Extent2D,
    format: TextureFormat,
    samples: SampleCount,
}

impl VulkanImage {
    /// Create an attachment image, its memory and its view
    pub(crate) fn new_attachment(ctx: Arc<GpuContext>, desc: &ImageDesc) -> Result<Self> {
        let format = format_to_vk(desc.format);
        let usage = image_usage_to_vk(desc.usage);
        let samples = sample_count_to_vk(desc.samples);

        unsafe {
            // Reject unsupported format / usage / sample-count combinations up front
            let properties = ctx.instance
                .get_physical_device_image_format_properties(
                    ctx.physical_device,
                    format,
                    vk::ImageType::TYPE_2D,
                    vk::ImageTiling::OPTIMAL,
                    usage,
                    vk::ImageCreateFlags::empty(),
                )
                .map_err(|e| vk_creation_error(
                    &format!("Format {:?} not supported for usage {:?}", desc.format, desc.usage), e))?;

            if !properties.sample_counts.contains(samples) {
                engine_error!(SOURCE, "Format {:?} does not support {} samples", desc.format, desc.samples.count());
                return Err(Error::ResourceCreationFailed(format!(
                    "Format {:?} does not support {} samples",
                    desc.format,
                    desc.samples.count()
                )));
            }

            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.extent.width,
                    height: desc.extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(samples)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| vk_creation_error("Failed to create attachment image", e))?;

            // Allocate memory
            let requirements = ctx.device.get_image_memory_requirements(image);

            let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
                name: "attachment",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for attachment ({}, {:?}, {:.2} MB)",
                        desc.extent, desc.format, size_mb);
                    ctx.device.destroy_image(image, None);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.allocator().free(allocation).ok();
                ctx.device.destroy_image(image, None);
                return Err(vk_creation_error("Failed to bind attachment image memory", e));
            }

            let aspect = aspect_for_format(desc.format);
            let view = match create_view(&ctx.device, image, format, aspect) {
                Ok(view) => view,
                Err(e) => {
                    ctx.allocator().free(allocation).ok();
                    ctx.device.destroy_image(image, None);
                    return Err(vk_creation_error("Failed to create attachment image view", e));
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                aspect,
                allocation: Some(allocation),
                owns_image: true,
                extent: desc.extent,
                format: desc.format,
                samples: desc.samples,
            })
        }
    }

    /// Wrap a swapchain image, creating its view
    pub(crate) fn new_swapchain_image(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        extent: Extent2D,
        format: TextureFormat,
    ) -> Result<Self> {
        let aspect = vk::ImageAspectFlags::COLOR;
        let view = create_view(&ctx.device, image, format_to_vk(format), aspect)
            .map_err(|e| vk_creation_error("Failed to create swapchain image view", e))?;

        Ok(Self {
            ctx,
            image,
            view,
            aspect,
            allocation: None,
            owns_image: false,
            extent,
            format,
            samples: SampleCount::S1,
        })
    }
}

fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> std::result::Result<vk::ImageView, vk::Result> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None) }
}

impl Image for VulkanImage {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn samples(&self) -> SampleCount {
        self.samples
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        unsafe {
            // Destroy image view
            self.ctx.device.destroy_image_view(self.view, None);

            if self.owns_image {
                // Free GPU memory
                if let Some(allocation) = self.allocation.take() {
                    self.ctx.allocator().free(allocation).ok();
                }

                // Destroy image
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
