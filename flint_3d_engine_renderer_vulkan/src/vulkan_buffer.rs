/// Buffer - Vulkan implementation of the Buffer trait

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{Buffer, BufferDesc, BufferUsage};
use flint_3d_engine::{engine_bail, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{vk_creation_error, GpuContext};

const SOURCE: &str = "flint3d::vulkan";

/// Vulkan buffer implementation (host-visible, persistently mapped)
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size
    size: u64,
}

fn usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::TRANSFER_DST;
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    flags
}

impl VulkanBuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail!(SOURCE, "Cannot create an empty buffer");
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| vk_creation_error(&format!("Failed to create buffer of size {} bytes", desc.size), e))?;

            // Allocate memory
            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(Error::OutOfMemory);
                }
            };

            // Bind memory
            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.allocator().free(allocation).ok();
                ctx.device.destroy_buffer(buffer, None);
                return Err(vk_creation_error("Failed to bind buffer memory", e));
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size: desc.size,
            })
        }
    }
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_error!(SOURCE, "Buffer write of {} bytes at offset {} exceeds size {}",
                data.len(), offset, self.size);
            return Err(Error::InvalidResource(format!(
                "Buffer write of {} bytes at offset {} exceeds size {}",
                data.len(),
                offset,
                self.size
            )));
        }

        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!(SOURCE, "Buffer write failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;

        // Map memory and copy data
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
