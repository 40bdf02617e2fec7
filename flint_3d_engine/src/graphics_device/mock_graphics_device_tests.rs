//! Unit tests for mock_graphics_device.rs

use super::*;
use std::time::Instant;

fn semaphore(device: &MockGraphicsDevice) -> Box<dyn GpuSemaphore> {
    device.create_semaphore().unwrap()
}

// ============================================================================
// FENCES
// ============================================================================

#[test]
fn test_fence_signaled_immediately_without_delay() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(false).unwrap();
    assert!(!fence.is_signaled().unwrap());

    device
        .submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_buffers: &[],
            wait_semaphores: &[],
            signal_semaphores: &[],
            fence: Some(fence.as_ref()),
        })
        .unwrap();

    assert!(fence.wait(Duration::from_millis(10)).unwrap());
}

#[test]
fn test_fence_signaled_after_delay() {
    let device = MockGraphicsDevice::new();
    device.set_submit_delay(Some(Duration::from_millis(60)));
    let fence = device.create_fence(false).unwrap();

    let start = Instant::now();
    device
        .submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_buffers: &[],
            wait_semaphores: &[],
            signal_semaphores: &[],
            fence: Some(fence.as_ref()),
        })
        .unwrap();

    assert!(!fence.wait(Duration::from_millis(5)).unwrap());
    assert!(fence.wait(Duration::from_secs(2)).unwrap());
    assert!(start.elapsed() >= Duration::from_millis(60));
    device.wait_idle().unwrap();
}

#[test]
fn test_hung_submission_never_signals() {
    let device = MockGraphicsDevice::new();
    device.set_hang_submits(true);
    let fence = device.create_fence(false).unwrap();
    device
        .submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_buffers: &[],
            wait_semaphores: &[],
            signal_semaphores: &[],
            fence: Some(fence.as_ref()),
        })
        .unwrap();

    assert!(!fence.wait(Duration::from_millis(30)).unwrap());
    assert!(matches!(device.wait_idle(), Err(Error::DeviceLost(_))));
}

#[test]
fn test_submit_failure_injection_leaves_fence_unsignaled() {
    let device = MockGraphicsDevice::new();
    device.fail_next_submits(1);
    let fence = device.create_fence(false).unwrap();
    let info = SubmitInfo {
        queue: QueueKind::Graphics,
        command_buffers: &[],
        wait_semaphores: &[],
        signal_semaphores: &[],
        fence: Some(fence.as_ref()),
    };

    assert_eq!(device.submit(&info), Err(Error::OutOfMemory));
    assert!(!fence.is_signaled().unwrap());
    assert_eq!(device.count_events("submit_failed"), 1);

    device.submit(&info).unwrap();
    assert!(fence.wait(Duration::from_millis(10)).unwrap());
}

// ============================================================================
// SWAPCHAIN
// ============================================================================

#[test]
fn test_scripted_acquire_then_round_robin() {
    let device = MockGraphicsDevice::new();
    device.set_min_image_count(3);
    let mut swapchain = device
        .create_swapchain(&SwapchainDesc { extent: Extent2D::new(64, 32), buffer_count: 2 })
        .unwrap();
    assert_eq!(swapchain.image_count(), 3);
    assert_eq!(swapchain.extent(), Extent2D::new(64, 32));

    device.script_acquire([MockAcquire::Image(2), MockAcquire::OutOfDate]);
    let sem = semaphore(&device);
    let timeout = Duration::from_secs(1);

    assert_eq!(
        swapchain.acquire_next_image(sem.as_ref(), timeout).unwrap(),
        AcquireStatus::Acquired { index: 2, suboptimal: false }
    );
    assert_eq!(swapchain.acquire_next_image(sem.as_ref(), timeout).unwrap(), AcquireStatus::OutOfDate);
    assert_eq!(
        swapchain.acquire_next_image(sem.as_ref(), timeout).unwrap(),
        AcquireStatus::Acquired { index: 0, suboptimal: false }
    );
}

#[test]
fn test_surface_extent_overrides_request() {
    let device = MockGraphicsDevice::new();
    device.set_surface_extent(Some(Extent2D::new(300, 200)));
    let mut swapchain = device
        .create_swapchain(&SwapchainDesc { extent: Extent2D::new(64, 32), buffer_count: 2 })
        .unwrap();
    assert_eq!(swapchain.extent(), Extent2D::new(300, 200));

    device.set_surface_extent(None);
    swapchain.recreate(Extent2D::new(128, 96)).unwrap();
    assert_eq!(swapchain.extent(), Extent2D::new(128, 96));
    assert_eq!(device.count_events("recreate_swapchain:128x96"), 1);
}

// ============================================================================
// OBJECT LIFETIME EVENTS
// ============================================================================

#[test]
fn test_image_failure_injection() {
    let device = MockGraphicsDevice::new();
    device.fail_next_image_creations(1);
    let desc = ImageDesc {
        extent: Extent2D::new(8, 8),
        format: TextureFormat::R8G8B8A8_UNORM,
        samples: SampleCount::S1,
        usage: ImageUsage::COLOR_ATTACHMENT,
    };

    assert!(matches!(
        device.create_attachment_image(&desc),
        Err(Error::ResourceCreationFailed(_))
    ));
    let image = device.create_attachment_image(&desc).unwrap();
    drop(image);

    let events = device.events();
    assert_eq!(events[0], "create_image_failed");
    assert!(events[1].starts_with("create_image:"));
    assert!(events[2].starts_with("destroy_image:"));
}

#[test]
fn test_command_stream_is_recorded_per_buffer() {
    let device = MockGraphicsDevice::new();
    let mut pool = device.create_command_pool(QueueKind::Graphics).unwrap();
    let mut buffers = pool.allocate(CommandBufferLevel::Primary, 1).unwrap();
    let cmd = &mut buffers[0];

    cmd.begin().unwrap();
    cmd.draw(3, 0).unwrap();
    cmd.end().unwrap();

    let id = cmd.as_any().downcast_ref::<MockCommandBuffer>().unwrap().id;
    assert_eq!(device.commands(id), vec!["begin", "draw:3:0", "end"]);

    // Beginning again starts a fresh recording
    cmd.begin().unwrap();
    assert_eq!(device.commands(id), vec!["begin"]);
}

#[test]
fn test_draw_failure_injection_skips_the_command() {
    let device = MockGraphicsDevice::new();
    let mut pool = device.create_command_pool(QueueKind::Graphics).unwrap();
    let mut buffers = pool.allocate(CommandBufferLevel::Primary, 1).unwrap();
    let cmd = &mut buffers[0];
    let id = cmd.as_any().downcast_ref::<MockCommandBuffer>().unwrap().id;

    device.fail_next_draws(1);
    cmd.begin().unwrap();
    assert!(matches!(cmd.draw(3, 0), Err(Error::BackendError(_))));
    cmd.draw(6, 0).unwrap();

    assert_eq!(device.commands(id), vec!["begin", "draw:6:0"]);
    assert_eq!(device.count_events("draw_failed:"), 1);
}
