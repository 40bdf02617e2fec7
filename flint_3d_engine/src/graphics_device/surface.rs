/// Surface properties and the swapchain choice algorithms
///
/// The choice functions are pure so every backend shares the same
/// preference orders and they can be tested without a GPU.

use bitflags::bitflags;
use crate::error::{Error, Result};
use crate::graphics_device::{Extent2D, TextureFormat};

/// Sentinel the platform reports when the surface size is decided by the swapchain
pub const UNDEFINED_EXTENT: u32 = u32::MAX;

/// Color space of a surface format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// sRGB non-linear (the only color space every platform supports)
    SrgbNonLinear,
    /// Any other platform color space (raw backend value)
    Other(i32),
}

/// A format / color space pair supported by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: TextureFormat,
    pub color_space: ColorSpace,
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Triple-buffered vsync, newest image replaces the queued one
    Mailbox,
    /// Vsync queue (always available)
    Fifo,
    /// Vsync queue, tears when late
    FifoRelaxed,
}

bitflags! {
    /// Composite alpha modes supported by a surface
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompositeAlphaFlags: u32 {
        const OPAQUE = 1 << 0;
        const PRE_MULTIPLIED = 1 << 1;
        const POST_MULTIPLIED = 1 << 2;
        const INHERIT = 1 << 3;
    }
}

/// Surface capabilities as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper limit
    pub max_image_count: u32,
    /// `UNDEFINED_EXTENT` in both components when the swapchain decides
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub supported_composite_alpha: CompositeAlphaFlags,
}

/// Pick the surface format: `B8G8R8A8_UNORM` + sRGB non-linear, else the first one
pub fn choose_surface_format(available: &[SurfaceFormat]) -> Result<SurfaceFormat> {
    let preferred = available.iter().find(|f| {
        f.format == TextureFormat::B8G8R8A8_UNORM && f.color_space == ColorSpace::SrgbNonLinear
    });

    match preferred.or_else(|| available.first()) {
        Some(format) => Ok(*format),
        None => Err(Error::InitializationFailed(
            "Surface reports no supported formats".to_string(),
        )),
    }
}

/// Pick the present mode: Mailbox, then Immediate, then Fifo
pub fn choose_present_mode(available: &[PresentMode]) -> PresentMode {
    [PresentMode::Mailbox, PresentMode::Immediate]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(PresentMode::Fifo)
}

/// Pick the swapchain extent
///
/// The surface's current extent wins when defined; otherwise the requested
/// extent is clamped to the supported range.
pub fn choose_extent(capabilities: &SurfaceCapabilities, requested: Extent2D) -> Extent2D {
    if capabilities.current_extent.width != UNDEFINED_EXTENT {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    Extent2D::new(
        requested.width.clamp(min.width, max.width.max(min.width)),
        requested.height.clamp(min.height, max.height.max(min.height)),
    )
}

/// Pick the swapchain image count: at least `buffer_count`, within platform limits
pub fn choose_image_count(capabilities: &SurfaceCapabilities, buffer_count: u32) -> u32 {
    let count = buffer_count.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Pick the composite alpha mode: Opaque, PreMultiplied, PostMultiplied, Inherit
pub fn choose_composite_alpha(supported: CompositeAlphaFlags) -> CompositeAlphaFlags {
    [
        CompositeAlphaFlags::OPAQUE,
        CompositeAlphaFlags::PRE_MULTIPLIED,
        CompositeAlphaFlags::POST_MULTIPLIED,
        CompositeAlphaFlags::INHERIT,
    ]
    .into_iter()
    .find(|mode| supported.contains(*mode))
    .unwrap_or(CompositeAlphaFlags::OPAQUE)
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
