/// Fence and semaphore - Vulkan implementations of the GPU synchronization traits

use flint_3d_engine::flint3d::Result;
use flint_3d_engine::flint3d::render::{Fence, GpuSemaphore};
use ash::vk;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_context::{vk_creation_error, vk_error, GpuContext};

/// Vulkan fence
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { ctx.device.create_fence(&create_info, None) }
            .map_err(|e| vk_creation_error("Failed to create fence", e))?;

        Ok(Self { ctx, fence })
    }
}

impl Fence for VulkanFence {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);

        match unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(vk_error("Failed to wait for fence", e)),
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }
            .map_err(|e| vk_error("Failed to reset fence", e))
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe { self.ctx.device.get_fence_status(self.fence) }
            .map_err(|e| vk_error("Failed to query fence status", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan binary semaphore
pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let semaphore = unsafe { ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| vk_creation_error("Failed to create semaphore", e))?;

        Ok(Self { ctx, semaphore })
    }
}

impl GpuSemaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
