/// Per-slot primary command buffers
///
/// One pool, one primary buffer per frame slot. A slot's buffer may only be
/// re-recorded once the slot's in-flight fence has signaled.

use crate::error::{Error, Result};
use crate::graphics_device::{CommandBuffer, CommandBufferLevel, CommandPool, GraphicsDevice, QueueKind};

pub struct CommandBufferSet {
    // Declared before the pool so the buffers are released first
    buffers: Vec<Box<dyn CommandBuffer>>,
    _pool: Box<dyn CommandPool>,
}

impl CommandBufferSet {
    /// Create a pool for `queue` and allocate `buffer_count` primary buffers
    pub fn new(device: &dyn GraphicsDevice, queue: QueueKind, buffer_count: usize) -> Result<Self> {
        let mut pool = device.create_command_pool(queue)?;
        let buffers = pool.allocate(CommandBufferLevel::Primary, buffer_count as u32)?;
        Ok(Self { buffers, _pool: pool })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Primary buffer of a slot
    pub fn primary(&self, slot: usize) -> Result<&dyn CommandBuffer> {
        self.buffers
            .get(slot)
            .map(|cmd| cmd.as_ref())
            .ok_or_else(|| Error::InvalidResource(format!("No command buffer for frame slot {}", slot)))
    }

    /// Primary buffer of a slot, for recording
    pub fn primary_mut(&mut self, slot: usize) -> Result<&mut dyn CommandBuffer> {
        let count = self.buffers.len();
        match self.buffers.get_mut(slot) {
            Some(cmd) => Ok(cmd.as_mut()),
            None => Err(Error::InvalidResource(format!(
                "No command buffer for frame slot {} ({} slots)",
                slot, count
            ))),
        }
    }
}
