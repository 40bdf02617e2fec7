//! Render targets
//!
//! A render target owns everything needed to render frames into a
//! destination: attachments, render pass, framebuffers, per-slot command
//! buffers and synchronization. `ScreenBoundRenderTarget` presents to a
//! window surface; `OffScreenRenderTarget` renders into sampled images.

pub mod attachment;
pub mod frame_sync;
pub mod offscreen_render_target;
pub mod render_target;
pub mod screen_bound_render_target;

pub use attachment::*;
pub use frame_sync::*;
pub use offscreen_render_target::*;
pub use render_target::*;
pub use screen_bound_render_target::*;
