/// GPU synchronization objects - fences and semaphores

use std::any::Any;
use std::time::Duration;
use crate::error::Result;

/// CPU-waitable fence, signaled by the GPU when submitted work completes
pub trait Fence: Send + Sync {
    /// Wait until the fence is signaled
    ///
    /// # Returns
    ///
    /// `true` if signaled, `false` if the timeout expired first
    fn wait(&self, timeout: Duration) -> Result<bool>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> Result<()>;

    /// Non-blocking status query
    fn is_signaled(&self) -> Result<bool>;

    fn as_any(&self) -> &dyn Any;
}

/// GPU-side binary semaphore (GPU/GPU ordering, never waited on by the CPU)
pub trait GpuSemaphore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
