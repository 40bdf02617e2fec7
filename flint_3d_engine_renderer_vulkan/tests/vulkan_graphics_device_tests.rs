//! Tests for VulkanGraphicsDevice
//!
//! These tests verify that VulkanGraphicsDevice correctly implements the
//! GraphicsDevice trait and drives the engine's render targets.
//! All tests require a GPU and are marked with #[ignore]. They share one
//! device (see gpu_test_utils.rs).
//!
//! Run with: cargo test --test vulkan_graphics_device_tests -- --ignored

use flint_3d_engine::flint3d::Error;
use flint_3d_engine::flint3d::render::{
    BufferDesc, BufferUsage, CommandBufferLevel, Extent2D, GraphicsDevice, ImageDesc,
    ImageLayout, ImageUsage, QueueKind, SampleCount, SubmitInfo, SwapchainDesc, TextureFormat,
};
use flint_3d_engine::flint3d::target::{
    FrameBegin, OffScreenRenderTarget, OffScreenRenderTargetDesc, RenderTarget, RenderTargetState,
    ScreenBoundRenderTarget, ScreenBoundRenderTargetDesc,
};
use std::time::Duration;

mod gpu_test_utils;
use gpu_test_utils::lock_test_graphics_device;

// ============================================================================
// DEVICE OBJECTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_capabilities() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    assert!(!device.device_name().is_empty());
    assert!(device.max_sample_count().count() >= 1);
    assert!(device.find_depth_format().unwrap().is_depth());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_and_transition_attachment() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let image = device.create_attachment_image(&ImageDesc {
        extent: Extent2D::new(256, 128),
        format: TextureFormat::R8G8B8A8_UNORM,
        samples: SampleCount::S1,
        usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
    }).unwrap();

    assert_eq!(image.extent(), Extent2D::new(256, 128));
    assert_eq!(image.format(), TextureFormat::R8G8B8A8_UNORM);

    device.transition_image_layouts(&[image.as_ref()], ImageLayout::Undefined, ImageLayout::ShaderReadOnlyOptimal)
        .unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_write_bounds() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let buffer = device.create_buffer(&BufferDesc { size: 64, usage: BufferUsage::UNIFORM }).unwrap();
    assert_eq!(buffer.size(), 64);

    buffer.write(0, &[1u8; 64]).unwrap();
    assert!(matches!(buffer.write(60, &[0u8; 8]), Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_fence_signaled_on_creation() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let fence = device.create_fence(true).unwrap();
    assert!(fence.is_signaled().unwrap());
    assert!(fence.wait(Duration::from_millis(10)).unwrap());

    fence.reset().unwrap();
    assert!(!fence.is_signaled().unwrap());
    assert!(!fence.wait(Duration::from_millis(1)).unwrap());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_submit_empty_command_buffer() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let mut pool = device.create_command_pool(QueueKind::Graphics).unwrap();
    let mut buffers = pool.allocate(CommandBufferLevel::Primary, 1).unwrap();
    buffers[0].begin().unwrap();
    buffers[0].end().unwrap();

    let fence = device.create_fence(false).unwrap();
    device.submit(&SubmitInfo {
        queue: QueueKind::Graphics,
        command_buffers: &[buffers[0].as_ref()],
        wait_semaphores: &[],
        signal_semaphores: &[],
        fence: Some(fence.as_ref()),
    }).unwrap();

    assert!(fence.wait(Duration::from_secs(5)).unwrap());
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_pipeline_cache_round_trip() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let cache = device.create_pipeline_cache(&[]).unwrap();
    let data = cache.data().unwrap();

    // Garbage seed data falls back to an empty cache
    assert!(device.create_pipeline_cache(&[0xAB; 7]).is_ok());
    assert!(device.create_pipeline_cache(&data).is_ok());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_swapchain_images() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let swapchain = device.create_swapchain(&SwapchainDesc {
        extent: Extent2D::new(800, 600),
        buffer_count: 2,
    }).unwrap();

    assert!(swapchain.image_count() >= 2);
    assert!(swapchain.image(0).is_some());
    assert!(swapchain.image(swapchain.image_count()).is_none());
    assert!(!swapchain.extent().is_zero());
}

// ============================================================================
// RENDER TARGETS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_screen_target_renders_frames() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let mut target = ScreenBoundRenderTarget::new(device, ScreenBoundRenderTargetDesc {
        extent: Extent2D::new(800, 600),
        ..ScreenBoundRenderTargetDesc::default()
    }).unwrap();
    target.prepare_static_resources().unwrap();

    for _ in 0..4 {
        if target.begin_frame().unwrap() == FrameBegin::Ready {
            target.update(&[]).unwrap();
            target.submit_frame().unwrap();
        }
    }

    target.terminate();
    assert_eq!(target.state(), RenderTargetState::Terminated);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_offscreen_target_resize() {
    let guard = lock_test_graphics_device();
    let device = &*guard;

    let mut target = OffScreenRenderTarget::new(device, OffScreenRenderTargetDesc {
        extent: Extent2D::new(128, 128),
        ..OffScreenRenderTargetDesc::default()
    }).unwrap();
    target.prepare_static_resources().unwrap();

    assert_eq!(target.begin_frame().unwrap(), FrameBegin::Ready);
    target.update(&[], &[]).unwrap();
    target.submit_frame().unwrap();

    target.notify_extent_changed(Extent2D::new(64, 32));
    target.recreate().unwrap();
    assert_eq!(target.extent(), Extent2D::new(64, 32));

    assert_eq!(target.begin_frame().unwrap(), FrameBegin::Ready);
    target.update(&[], &[]).unwrap();
    target.submit_frame().unwrap();

    target.terminate();
}
