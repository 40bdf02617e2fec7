/// Image trait - attachment images and their views

use std::any::Any;
use bitflags::bitflags;
use crate::graphics_device::{Extent2D, SampleCount, TextureFormat};

/// GPU-side image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents undefined (initial state, or contents may be discarded)
    Undefined,
    /// Any access, suboptimal
    General,
    /// Color attachment output
    ColorAttachmentOptimal,
    /// Depth/stencil attachment output
    DepthStencilAttachmentOptimal,
    /// Read-only depth/stencil (sampled or tested)
    DepthStencilReadOnlyOptimal,
    /// Sampled in shaders
    ShaderReadOnlyOptimal,
    /// Transfer source
    TransferSrcOptimal,
    /// Transfer destination
    TransferDstOptimal,
    /// Ready for presentation
    PresentSrc,
}

bitflags! {
    /// How an image will be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 1;
        const SAMPLED = 1 << 2;
        /// Contents never leave tile memory (multisampled color resolved in-pass)
        const TRANSIENT = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
    }
}

/// Attachment image descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: Extent2D,
    pub format: TextureFormat,
    pub samples: SampleCount,
    pub usage: ImageUsage,
}

/// A 2D image with a single mip level and its default view
pub trait Image: Send + Sync {
    /// Image size in pixels
    fn extent(&self) -> Extent2D;

    /// Pixel format
    fn format(&self) -> TextureFormat;

    /// Samples per pixel
    fn samples(&self) -> SampleCount;

    /// Downcast support for the backend
    fn as_any(&self) -> &dyn Any;
}
