/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Instance, surface and logical device
/// - Allocator for memory management
/// - Queues (graphics/present, compute, transfer) and the lock serializing them
/// - Command pool for one-shot layout transitions
///
/// Every backend object holds an `Arc<GpuContext>`, so the device, the
/// surface and the instance are destroyed after the last object using them.

use ash::vk;
use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::QueueKind;
use flint_3d_engine::engine_error;
use gpu_allocator::vulkan::Allocator;
use std::any::Any;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "flint3d::vulkan";

/// Queue family index and queue handle
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueInfo {
    pub family: u32,
    pub queue: vk::Queue,
}

/// Queues used by the device
///
/// Compute and transfer alias the graphics queue when the hardware has no
/// dedicated family. The graphics queue also presents.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Queues {
    pub graphics: QueueInfo,
    pub compute: QueueInfo,
    pub transfer: QueueInfo,
}

impl Queues {
    pub(crate) fn get(&self, kind: QueueKind) -> QueueInfo {
        match kind {
            QueueKind::Graphics => self.graphics,
            QueueKind::Compute => self.compute,
            QueueKind::Transfer => self.transfer,
        }
    }
}

/// Shared GPU context for all Vulkan resources.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) queues: Queues,

    /// Serializes every queue submission and presentation
    queue_lock: Mutex<()>,

    /// Reusable command pool for one-shot layout transitions
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    pub(crate) physical_device: vk::PhysicalDevice,

    /// Presentation surface, kept for the device's lifetime
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) surface_loader: ash::khr::surface::Instance,

    pub(crate) instance: ash::Instance,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    /// Vulkan entry, must outlive the instance
    _entry: ash::Entry,
}

/// Handles the context takes ownership of
pub(crate) struct GpuContextParts {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub queues: Queues,
    pub allocator: Allocator,
    pub upload_command_pool: vk::CommandPool,
}

impl GpuContext {
    pub(crate) fn new(parts: GpuContextParts) -> Self {
        Self {
            device: parts.device,
            allocator: ManuallyDrop::new(Mutex::new(parts.allocator)),
            queues: parts.queues,
            queue_lock: Mutex::new(()),
            upload_command_pool: Mutex::new(parts.upload_command_pool),
            physical_device: parts.physical_device,
            surface: parts.surface,
            surface_loader: parts.surface_loader,
            instance: parts.instance,
            debug_utils_loader: parts.debug_utils_loader,
            debug_messenger: parts.debug_messenger,
            _entry: parts.entry,
        }
    }

    /// Lock the memory allocator
    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the queues for a submission or a presentation
    pub(crate) fn lock_queues(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Destroy the upload command pool
            let pool = *self.upload_command_pool.get_mut().unwrap_or_else(PoisonError::into_inner);
            if pool != vk::CommandPool::null() {
                self.device.destroy_command_pool(pool, None);
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Destroy device
            self.device.destroy_device(None);

            // 4. Destroy surface
            self.surface_loader.destroy_surface(self.surface, None);

            // 5. Cleanup debug config to prevent callbacks during destruction,
            //    then destroy debug messenger BEFORE instance
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 6. Destroy instance
            self.instance.destroy_instance(None);
        }
    }
}

/// Map a failed Vulkan call to an engine error, logging it
///
/// Device loss, surface loss and memory exhaustion get their own variants;
/// anything else is a backend error.
pub(crate) fn vk_error(what: &str, result: vk::Result) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, result);
    classify_vk_result(what, result)
}

/// Like `vk_error`, for failures while creating an object
pub(crate) fn vk_creation_error(what: &str, result: vk::Result) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, result);
    match classify_vk_result(what, result) {
        Error::BackendError(message) => Error::ResourceCreationFailed(message),
        other => other,
    }
}

pub(crate) fn classify_vk_result(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost(format!("{}: {:?}", what, result)),
        vk::Result::ERROR_SURFACE_LOST_KHR => Error::SurfaceLost(format!("{}: {:?}", what, result)),
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfMemory,
        _ => Error::BackendError(format!("{}: {:?}", what, result)),
    }
}

/// Abort construction with `Error::InitializationFailed`, logging it
pub(crate) fn init_error(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

/// Downcast an engine object to the Vulkan type that implements it
///
/// Fails with `Error::InvalidResource` when the object comes from another device type.
pub(crate) fn downcast<'a, T: 'static>(object: &'a dyn Any, what: &str) -> Result<&'a T> {
    object.downcast_ref::<T>().ok_or_else(|| {
        engine_error!(SOURCE, "{} was not created by the Vulkan device", what);
        Error::InvalidResource(format!("{} was not created by the Vulkan device", what))
    })
}

#[cfg(test)]
#[path = "vulkan_context_tests.rs"]
mod tests;
