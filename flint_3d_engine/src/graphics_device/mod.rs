/// Graphics device module - the seam between the engine and its backend

pub mod config;
pub mod format;
pub mod image;
pub mod surface;
pub mod swapchain;
pub mod fence;
pub mod render_pass;
pub mod frame_buffer;
pub mod command_buffer;
pub mod buffer;
pub mod pipeline;
pub mod graphics_device;

pub use config::*;
pub use format::*;
pub use image::*;
pub use surface::*;
pub use swapchain::*;
pub use fence::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use command_buffer::*;
pub use buffer::*;
pub use pipeline::*;
pub use graphics_device::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
