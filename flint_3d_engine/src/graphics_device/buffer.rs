/// Buffer trait and buffer descriptor

use std::any::Any;
use bitflags::bitflags;
use crate::error::Result;

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Host-visible GPU buffer
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Copy bytes into the buffer
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if `offset + data.len()` exceeds the buffer size.
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
