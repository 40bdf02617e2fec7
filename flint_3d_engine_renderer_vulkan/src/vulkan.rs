/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Creates the instance (with optional validation layers), the window
/// surface, the logical device and its queues, and the memory allocator.
/// Everything the device creates shares its `GpuContext`.

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{
    Buffer, BufferDesc, CommandPool, ComputePipelineCreateInfo, Config, DebugSeverity, Fence,
    Framebuffer, FramebufferDesc, GpuSemaphore, GraphicsDevice, GraphicsPipelineCreateInfo, Image,
    ImageDesc, ImageLayout, PipelineCache, PipelineObject, PresentRequest, PresentStatus,
    QueueKind, RenderPass, RenderPassDesc, ResourceBinding, ResourcePackage, SampleCount,
    SubmitInfo, Swapchain, SwapchainDesc, TextureFormat, DEPTH_FORMAT_CANDIDATES,
};
use flint_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::sync::{Arc, PoisonError};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_buffer::{record_layout_transition, VulkanCommandBuffer, VulkanCommandPool};
use crate::vulkan_context::{
    downcast, init_error, vk_error, GpuContext, GpuContextParts, QueueInfo, Queues,
};
use crate::vulkan_format::{format_to_vk, highest_sample_count, pipeline_stages_to_vk};
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_pipeline::{VulkanPipeline, VulkanPipelineCache, VulkanResourcePackage};
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_sync::{VulkanFence, VulkanSemaphore};

const SOURCE: &str = "flint3d::vulkan";

/// Queue family indices picked for a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    /// Graphics + present
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
}

/// Pick queue families from their properties
///
/// `can_present(i)` tells whether family `i` can present to the surface.
/// Compute and transfer prefer dedicated families and fall back to the
/// graphics family. Returns `None` when no family does graphics and present.
pub(crate) fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    can_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let indexed = || families.iter().enumerate().map(|(i, family)| (i as u32, family.queue_flags));

    let graphics = indexed()
        .find(|&(i, flags)| flags.contains(vk::QueueFlags::GRAPHICS) && can_present(i))
        .map(|(i, _)| i)?;

    let compute = indexed()
        .find(|&(_, flags)| flags.contains(vk::QueueFlags::COMPUTE) && !flags.contains(vk::QueueFlags::GRAPHICS))
        .map_or(graphics, |(i, _)| i);

    let transfer = indexed()
        .find(|&(_, flags)| {
            flags.contains(vk::QueueFlags::TRANSFER)
                && !flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
        })
        .map_or(graphics, |(i, _)| i);

    Some(QueueFamilies { graphics, compute, transfer })
}

/// Severity flags the messenger subscribes to
pub(crate) fn messenger_severity(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Instance-level objects, destroyed in reverse order if device creation fails
struct InstanceObjects {
    entry: ash::Entry,
    instance: ash::Instance,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl InstanceObjects {
    unsafe fn destroy(self) {
        self.surface_loader.destroy_surface(self.surface, None);
        crate::debug::cleanup_debug_config();
        if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}

/// Logical device and queues
struct DeviceObjects {
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queues: Queues,
    max_samples: SampleCount,
    device_name: String,
}

/// Vulkan graphics device
///
/// Central object for creating GPU objects and the only path to the queues.
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    config: Config,
    max_samples: SampleCount,
    device_name: String,
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan device presenting to `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Device configuration
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        let objects = unsafe { Self::create_instance_objects(window, &config)? };

        let device_objects = match unsafe { Self::create_device(&objects) } {
            Ok(device_objects) => device_objects,
            Err(e) => {
                unsafe { objects.destroy() };
                return Err(e);
            }
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: objects.instance.clone(),
            device: device_objects.device.clone(),
            physical_device: device_objects.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe {
                    device_objects.device.destroy_device(None);
                    objects.destroy();
                }
                return Err(init_error("Failed to create GPU allocator", e));
            }
        };

        // Upload command pool (TRANSIENT + RESET for reusable one-shot transitions)
        let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device_objects.queues.graphics.family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let upload_command_pool = match unsafe {
            device_objects.device.create_command_pool(&upload_pool_create_info, None)
        } {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                unsafe {
                    device_objects.device.destroy_device(None);
                    objects.destroy();
                }
                return Err(init_error("Failed to create upload command pool", e));
            }
        };

        let ctx = Arc::new(GpuContext::new(GpuContextParts {
            entry: objects.entry,
            instance: objects.instance,
            debug_utils_loader: objects.debug_utils_loader,
            debug_messenger: objects.debug_messenger,
            surface: objects.surface,
            surface_loader: objects.surface_loader,
            physical_device: device_objects.physical_device,
            device: device_objects.device,
            queues: device_objects.queues,
            allocator,
            upload_command_pool,
        }));

        engine_info!(SOURCE, "Vulkan device ready on '{}' (max {} samples)",
            device_objects.device_name, device_objects.max_samples.count());

        Ok(Self {
            ctx,
            config,
            max_samples: device_objects.max_samples,
            device_name: device_objects.device_name,
        })
    }

    /// Name of the physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    unsafe fn create_instance_objects<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
    ) -> Result<InstanceObjects> {
        let entry = ash::Entry::load()
            .map_err(|e| init_error("Failed to load Vulkan library", e))?;

        let app_name = CString::new(config.app_name.as_str())
            .map_err(|e| init_error("Invalid application name", e))?;
        let (major, minor, patch) = config.app_version;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Flint3D")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        // Required extensions
        let display_handle = window.display_handle()
            .map_err(|e| init_error("Failed to get display handle", e))?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| init_error("Failed to get required extensions", e))?
            .to_vec();

        if config.enable_validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names = if config.enable_validation {
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = entry
            .create_instance(&create_info, None)
            .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

        // Debug messenger
        let (debug_utils_loader, debug_messenger) = if config.enable_validation {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

            crate::debug::init_debug_config(crate::debug::DebugConfig::from_config(config));

            let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(messenger_severity(config.debug_severity))
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

            match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    crate::debug::cleanup_debug_config();
                    instance.destroy_instance(None);
                    return Err(init_error("Failed to create debug messenger", e));
                }
            }
        } else {
            (None, None)
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let surface = window.window_handle()
            .map_err(|e| init_error("Failed to get window handle", e))
            .and_then(|window_handle| {
                ash_window::create_surface(&entry, &instance, display_handle.as_raw(), window_handle.as_raw(), None)
                    .map_err(|e| init_error("Failed to create surface", e))
            });

        let surface = match surface {
            Ok(surface) => surface,
            Err(e) => {
                crate::debug::cleanup_debug_config();
                if let (Some(debug_utils), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                    debug_utils.destroy_debug_utils_messenger(messenger, None);
                }
                instance.destroy_instance(None);
                return Err(e);
            }
        };

        Ok(InstanceObjects {
            entry,
            instance,
            debug_utils_loader,
            debug_messenger,
            surface,
            surface_loader,
        })
    }

    unsafe fn create_device(objects: &InstanceObjects) -> Result<DeviceObjects> {
        let instance = &objects.instance;

        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

        // Candidates with a graphics + present family, discrete GPUs first
        let mut candidates: Vec<(vk::PhysicalDevice, QueueFamilies, vk::PhysicalDeviceProperties)> = physical_devices
            .into_iter()
            .filter_map(|physical_device| {
                let families = instance.get_physical_device_queue_family_properties(physical_device);
                let selected = select_queue_families(&families, |i| {
                    objects.surface_loader
                        .get_physical_device_surface_support(physical_device, i, objects.surface)
                        .unwrap_or(false)
                })?;
                let properties = instance.get_physical_device_properties(physical_device);
                Some((physical_device, selected, properties))
            })
            .collect();
        candidates.sort_by_key(|(_, _, properties)| properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU);

        let (physical_device, families, properties) = candidates
            .into_iter()
            .next()
            .ok_or_else(|| init_error("No GPU with a graphics queue able to present", vk::Result::ERROR_INITIALIZATION_FAILED))?;

        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        // Logical device with one queue per distinct family
        let queue_priorities = [1.0];
        let mut unique_families = vec![families.graphics, families.compute, families.transfer];
        unique_families.sort_unstable();
        unique_families.dedup();

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        // Optional fixed-function features used by dynamic states and polygon modes
        let supported = instance.get_physical_device_features(physical_device);
        let device_features = vk::PhysicalDeviceFeatures::default()
            .wide_lines(supported.wide_lines == vk::TRUE)
            .depth_bounds(supported.depth_bounds == vk::TRUE)
            .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        let device = instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| init_error("Failed to create logical device", e))?;

        let queue = |family: u32| QueueInfo {
            family,
            queue: device.get_device_queue(family, 0),
        };
        let queues = Queues {
            graphics: queue(families.graphics),
            compute: queue(families.compute),
            transfer: queue(families.transfer),
        };

        let limits = properties.limits;
        let max_samples = highest_sample_count(
            limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts,
        );

        engine_debug!(SOURCE, "Queue families: graphics {}, compute {}, transfer {}",
            families.graphics, families.compute, families.transfer);

        Ok(DeviceObjects {
            physical_device,
            device,
            queues,
            max_samples,
            device_name,
        })
    }

    fn wait_fence_bounded(&self, fence: &VulkanFence, what: &str) -> Result<()> {
        if fence.wait(self.config.fence_timeout)? {
            Ok(())
        } else {
            engine_error!(SOURCE, "{} did not complete within {:?}", what, self.config.fence_timeout);
            Err(Error::DeviceLost(format!("{} did not complete within {:?}", what, self.config.fence_timeout)))
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn config(&self) -> &Config {
        &self.config
    }

    fn max_sample_count(&self) -> SampleCount {
        self.max_samples
    }

    fn find_depth_format(&self) -> Result<TextureFormat> {
        DEPTH_FORMAT_CANDIDATES
            .iter()
            .copied()
            .find(|&format| {
                let properties = unsafe {
                    self.ctx.instance.get_physical_device_format_properties(
                        self.ctx.physical_device,
                        format_to_vk(format),
                    )
                };
                properties.optimal_tiling_features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| {
                engine_error!(SOURCE, "No supported depth format among {:?}", DEPTH_FORMAT_CANDIDATES);
                Error::ResourceCreationFailed("No supported depth format".to_string())
            })
    }

    fn create_attachment_image(&self, desc: &ImageDesc) -> Result<Box<dyn Image>> {
        Ok(Box::new(VulkanImage::new_attachment(Arc::clone(&self.ctx), desc)?))
    }

    fn transition_image_layouts(
        &self,
        images: &[&dyn Image],
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }

        let vk_images = images
            .iter()
            .map(|image| downcast::<VulkanImage>(image.as_any(), "Image"))
            .collect::<Result<Vec<_>>>()?;

        let device = &self.ctx.device;
        let pool = self.ctx.upload_command_pool.lock().unwrap_or_else(PoisonError::into_inner);

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = device.allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("Failed to allocate transition command buffer", e))?[0];

            let result = (|| {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| vk_error("Failed to begin transition command buffer", e))?;

                record_layout_transition(device, command_buffer, &vk_images, old_layout, new_layout);

                device.end_command_buffer(command_buffer)
                    .map_err(|e| vk_error("Failed to end transition command buffer", e))?;

                let fence = VulkanFence::new(Arc::clone(&self.ctx), false)?;
                let command_buffers = [command_buffer];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

                {
                    let _queues = self.ctx.lock_queues();
                    device.queue_submit(self.ctx.queues.graphics.queue, &[submit_info], fence.fence)
                        .map_err(|e| vk_error("Failed to submit layout transition", e))?;
                }

                self.wait_fence_bounded(&fence, "Layout transition")
            })();

            device.free_command_buffers(*pool, &[command_buffer]);

            if result.is_ok() {
                engine_debug!(SOURCE, "Transitioned {} image(s) {:?} -> {:?}", images.len(), old_layout, new_layout);
            }
            result
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(VulkanSwapchain::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(VulkanRenderPass::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(VulkanFramebuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(VulkanFence::new(Arc::clone(&self.ctx), signaled)?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn GpuSemaphore>> {
        Ok(Box::new(VulkanSemaphore::new(Arc::clone(&self.ctx))?))
    }

    fn create_command_pool(&self, queue: QueueKind) -> Result<Box<dyn CommandPool>> {
        Ok(Box::new(VulkanCommandPool::new(Arc::clone(&self.ctx), queue)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(VulkanBuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_pipeline_cache(&self, initial_data: &[u8]) -> Result<Box<dyn PipelineCache>> {
        Ok(Box::new(VulkanPipelineCache::new(Arc::clone(&self.ctx), initial_data)?))
    }

    fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Arc<dyn PipelineObject>> {
        Ok(Arc::new(VulkanPipeline::new_graphics(Arc::clone(&self.ctx), info)?))
    }

    fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Arc<dyn PipelineObject>> {
        Ok(Arc::new(VulkanPipeline::new_compute(Arc::clone(&self.ctx), info)?))
    }

    fn create_resource_package(
        &self,
        pipeline: &dyn PipelineObject,
        set: u32,
        bindings: &[ResourceBinding],
    ) -> Result<Arc<dyn ResourcePackage>> {
        let pipeline = downcast::<VulkanPipeline>(pipeline.as_any(), "Pipeline")?;
        Ok(Arc::new(VulkanResourcePackage::new(Arc::clone(&self.ctx), pipeline, set, bindings)?))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let command_buffers = info.command_buffers
            .iter()
            .map(|buffer| downcast::<VulkanCommandBuffer>(buffer.as_any(), "Command buffer")
                .map(|buffer| buffer.command_buffer))
            .collect::<Result<Vec<_>>>()?;

        let mut wait_semaphores = Vec::with_capacity(info.wait_semaphores.len());
        let mut wait_stages = Vec::with_capacity(info.wait_semaphores.len());
        for (semaphore, stage) in info.wait_semaphores {
            wait_semaphores.push(downcast::<VulkanSemaphore>(semaphore.as_any(), "Wait semaphore")?.semaphore);
            wait_stages.push(pipeline_stages_to_vk(*stage));
        }

        let signal_semaphores = info.signal_semaphores
            .iter()
            .map(|semaphore| downcast::<VulkanSemaphore>(semaphore.as_any(), "Signal semaphore")
                .map(|semaphore| semaphore.semaphore))
            .collect::<Result<Vec<_>>>()?;

        let fence = match info.fence {
            Some(fence) => downcast::<VulkanFence>(fence.as_any(), "Fence")?.fence,
            None => vk::Fence::null(),
        };

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let queue = self.ctx.queues.get(info.queue).queue;
        let _queues = self.ctx.lock_queues();

        unsafe { self.ctx.device.queue_submit(queue, &[submit_info], fence) }
            .map_err(|e| vk_error(&format!("Failed to submit commands to the {:?} queue", info.queue), e))
    }

    fn present(&self, request: &PresentRequest) -> Result<PresentStatus> {
        let swapchain = downcast::<VulkanSwapchain>(request.swapchain.as_any(), "Swapchain")?;
        let semaphore = downcast::<VulkanSemaphore>(request.wait_semaphore.as_any(), "Present semaphore")?;

        let wait_semaphores = [semaphore.semaphore];
        let swapchains = [swapchain.swapchain];
        let image_indices = [request.image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queues = self.ctx.lock_queues();
            unsafe { swapchain.swapchain_loader.queue_present(self.ctx.queues.graphics.queue, &present_info) }
        };

        match result {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(e) => Err(vk_error("Failed to present swapchain image", e)),
        }
    }

    fn wait_idle(&self) -> Result<()> {
        let _queues = self.ctx.lock_queues();
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| vk_error("Failed to wait for device idle", e))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        let _queues = self.ctx.lock_queues();
        if let Err(e) = unsafe { self.ctx.device.device_wait_idle() } {
            engine_warn!(SOURCE, "Device wait idle failed during shutdown: {:?}", e);
        }
        engine_debug!(SOURCE, "Vulkan device '{}' released ({} object(s) still hold the context)",
            self.device_name, Arc::strong_count(&self.ctx) - 1);
    }
}

#[cfg(test)]
#[path = "vulkan_tests.rs"]
mod tests;
