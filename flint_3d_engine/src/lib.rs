/*!
# Flint 3D Engine

Core of the Flint 3D rendering engine: frame-synchronized render targets and
command submission, independent of any graphics API.

The engine talks to the GPU through the `GraphicsDevice` trait family
(images, swapchains, render passes, command buffers, fences). A backend
crate (Vulkan) provides the concrete implementation.

## Architecture

- **ScreenBoundRenderTarget**: renders into swapchain images and presents them,
  with N frames in flight, deferred resize and swapchain recreation
- **OffScreenRenderTarget**: renders into sampled attachments, with compute
  dispatch before the render pass
- **SecondaryRecorder**: persistent worker threads recording secondary command
  buffers in parallel
- **GraphicsPipeline / ComputePipeline**: pipelines rebuilt with their render
  target, with on-disk pipeline caches
- **BinarySemaphore / CountingSemaphore**: CPU synchronization used by the
  worker pool
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod sync;
pub mod graphics_device;
pub mod command;
pub mod target;
pub mod pipeline;

// Main flint3d namespace module
pub mod flint3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (global logger)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device seam: traits and value types backends implement
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::command::*;
    }

    // Render targets
    pub mod target {
        pub use crate::target::*;
    }

    // Pipelines and pipeline caches
    pub mod pipeline {
        pub use crate::pipeline::*;
    }

    // CPU synchronization primitives
    pub mod sync {
        pub use crate::sync::*;
    }
}

// Re-export math library at crate root
pub use glam;
