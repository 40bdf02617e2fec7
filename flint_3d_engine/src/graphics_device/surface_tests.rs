//! Unit tests for surface.rs

use crate::error::Error;
use crate::graphics_device::*;

fn caps(current: Extent2D) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: 2,
        max_image_count: 4,
        current_extent: current,
        min_image_extent: Extent2D::new(16, 16),
        max_image_extent: Extent2D::new(4096, 2048),
        supported_composite_alpha: CompositeAlphaFlags::OPAQUE,
    }
}

fn undefined() -> Extent2D {
    Extent2D::new(UNDEFINED_EXTENT, UNDEFINED_EXTENT)
}

// ============================================================================
// SURFACE FORMAT
// ============================================================================

#[test]
fn test_surface_format_prefers_bgra_unorm_srgb() {
    let formats = [
        SurfaceFormat { format: TextureFormat::R8G8B8A8_UNORM, color_space: ColorSpace::SrgbNonLinear },
        SurfaceFormat { format: TextureFormat::B8G8R8A8_UNORM, color_space: ColorSpace::Other(1_000_104_002) },
        SurfaceFormat { format: TextureFormat::B8G8R8A8_UNORM, color_space: ColorSpace::SrgbNonLinear },
    ];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen, formats[2]);
}

#[test]
fn test_surface_format_falls_back_to_first() {
    let formats = [
        SurfaceFormat { format: TextureFormat::R16G16B16A16_SFLOAT, color_space: ColorSpace::Other(3) },
        SurfaceFormat { format: TextureFormat::R8G8B8A8_SRGB, color_space: ColorSpace::SrgbNonLinear },
    ];
    assert_eq!(choose_surface_format(&formats).unwrap(), formats[0]);
}

#[test]
fn test_surface_format_empty_is_error() {
    let result = choose_surface_format(&[]);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// PRESENT MODE
// ============================================================================

#[test]
fn test_present_mode_preference_order() {
    use PresentMode::*;
    assert_eq!(choose_present_mode(&[Fifo, Immediate, Mailbox]), Mailbox);
    assert_eq!(choose_present_mode(&[Fifo, Immediate]), Immediate);
    assert_eq!(choose_present_mode(&[FifoRelaxed, Fifo]), Fifo);
    assert_eq!(choose_present_mode(&[]), Fifo);
}

// ============================================================================
// EXTENT
// ============================================================================

#[test]
fn test_extent_uses_current_when_defined() {
    let chosen = choose_extent(&caps(Extent2D::new(800, 600)), Extent2D::new(1920, 1080));
    assert_eq!(chosen, Extent2D::new(800, 600));
}

#[test]
fn test_extent_clamps_when_undefined() {
    let c = caps(undefined());
    assert_eq!(choose_extent(&c, Extent2D::new(1280, 720)), Extent2D::new(1280, 720));
    assert_eq!(choose_extent(&c, Extent2D::new(8, 10_000)), Extent2D::new(16, 2048));
}

// ============================================================================
// IMAGE COUNT / COMPOSITE ALPHA
// ============================================================================

#[test]
fn test_image_count_respects_limits() {
    let mut c = caps(undefined());
    assert_eq!(choose_image_count(&c, 1), 2);
    assert_eq!(choose_image_count(&c, 3), 3);
    assert_eq!(choose_image_count(&c, 8), 4);

    c.max_image_count = 0;
    assert_eq!(choose_image_count(&c, 8), 8);
}

#[test]
fn test_composite_alpha_preference_order() {
    assert_eq!(
        choose_composite_alpha(CompositeAlphaFlags::INHERIT | CompositeAlphaFlags::PRE_MULTIPLIED),
        CompositeAlphaFlags::PRE_MULTIPLIED
    );
    assert_eq!(
        choose_composite_alpha(CompositeAlphaFlags::INHERIT | CompositeAlphaFlags::POST_MULTIPLIED),
        CompositeAlphaFlags::POST_MULTIPLIED
    );
    assert_eq!(choose_composite_alpha(CompositeAlphaFlags::all()), CompositeAlphaFlags::OPAQUE);
    assert_eq!(choose_composite_alpha(CompositeAlphaFlags::empty()), CompositeAlphaFlags::OPAQUE);
}

// ============================================================================
// FORMAT HELPERS
// ============================================================================

#[test]
fn test_texture_format_depth_helpers() {
    assert!(TextureFormat::D32_SFLOAT.is_depth());
    assert!(!TextureFormat::D32_SFLOAT.has_stencil());
    assert!(TextureFormat::D24_UNORM_S8_UINT.has_stencil());
    assert!(!TextureFormat::B8G8R8A8_SRGB.is_depth());
}

#[test]
fn test_sample_count_clamp() {
    assert_eq!(SampleCount::S8.clamp_to(SampleCount::S4), SampleCount::S4);
    assert_eq!(SampleCount::S2.clamp_to(SampleCount::S4), SampleCount::S2);
    assert_eq!(SampleCount::from_count(16).map(SampleCount::count), Some(16));
    assert_eq!(SampleCount::from_count(3), None);
    assert!(Extent2D::new(0, 10).is_zero());
}
