/// CPU-side synchronization primitives
///
/// GPU-side fences and semaphores live behind the device seam
/// (`graphics_device::Fence`, `graphics_device::GpuSemaphore`).

pub mod binary_semaphore;
pub mod counting_semaphore;

pub use binary_semaphore::*;
pub use counting_semaphore::*;
