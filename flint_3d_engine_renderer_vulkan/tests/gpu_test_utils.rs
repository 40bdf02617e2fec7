#![allow(dead_code)]
//! GPU test utilities - one VulkanGraphicsDevice shared by all GPU tests
//!
//! winit allows a single event loop per process, and a surface can only back
//! one swapchain at a time. The shared device lives behind a mutex; tests
//! hold the guard for their whole body so they never overlap on the surface.

use flint_3d_engine::flint3d::render::Config;
use flint_3d_engine_renderer_vulkan::VulkanGraphicsDevice;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use winit::event_loop::{EventLoop, EventLoopBuilder};
use winit::window::Window;

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
#[cfg(all(unix, not(target_os = "macos")))]
use winit::platform::x11::EventLoopBuilderExtX11;

/// Shared device (initialized once)
static GPU_GRAPHICS_DEVICE: OnceLock<Mutex<VulkanGraphicsDevice>> = OnceLock::new();

/// Window backing the device surface
/// Note: the EventLoop is leaked with mem::forget so the window stays valid
static GPU_WINDOW: OnceLock<Window> = OnceLock::new();

/// Validation off: the tests check behavior, not layer output
pub fn test_config() -> Config {
    Config {
        enable_validation: false,
        ..Config::default()
    }
}

/// Lock the shared VulkanGraphicsDevice, creating it on first use
pub fn lock_test_graphics_device() -> MutexGuard<'static, VulkanGraphicsDevice> {
    GPU_GRAPHICS_DEVICE
        .get_or_init(|| {
            let (window, event_loop) = create_test_window();

            let graphics_device = VulkanGraphicsDevice::new(&window, test_config())
                .expect("Failed to create VulkanGraphicsDevice for tests");

            // EventLoop is not Sync and cannot be stored in a static
            std::mem::forget(event_loop);
            GPU_WINDOW.set(window).ok();

            Mutex::new(graphics_device)
        })
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Hidden window on an event loop that may live outside the main thread
/// (cargo runs tests on worker threads)
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = {
        #[cfg(any(target_os = "windows", all(unix, not(target_os = "macos"))))]
        {
            EventLoopBuilder::new().with_any_thread(true).build().unwrap()
        }
        #[cfg(not(any(target_os = "windows", all(unix, not(target_os = "macos")))))]
        {
            EventLoopBuilder::new().build().unwrap()
        }
    };

    let window_attrs = Window::default_attributes()
        .with_title("GPU Test Window")
        .with_inner_size(winit::dpi::PhysicalSize::new(800, 600))
        .with_visible(false);

    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}
