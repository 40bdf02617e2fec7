/// RenderPass trait - describes how attachments are loaded, stored and transitioned

use std::any::Any;
use bitflags::bitflags;
use crate::graphics_device::{ImageLayout, SampleCount, TextureFormat};

/// Render pass
///
/// Describes how attachments are loaded, stored, and transitioned during rendering.
pub trait RenderPass: Send + Sync {
    /// Number of attachments the render pass was created with
    fn attachment_count(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDescription {
    pub format: TextureFormat,
    pub samples: SampleCount,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    /// Layout the image is in when the render pass begins
    pub initial_layout: ImageLayout,
    /// Layout the render pass leaves the image in
    pub final_layout: ImageLayout,
}

/// Reference to an attachment from a subpass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Index into `RenderPassDesc::attachments`
    pub attachment: u32,
    /// Layout during the subpass
    pub layout: ImageLayout,
}

/// Single graphics subpass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubpassDesc {
    pub color_attachments: Vec<AttachmentReference>,
    /// Either empty or one resolve target per color attachment
    pub resolve_attachments: Vec<AttachmentReference>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
}

/// Subpass reference inside a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    /// Commands before or after the render pass
    External,
    Index(u32),
}

bitflags! {
    /// Pipeline stages, used for dependencies and semaphore waits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const COMPUTE_SHADER = 1 << 6;
        const TRANSFER = 1 << 7;
        const BOTTOM_OF_PIPE = 1 << 8;
        const ALL_COMMANDS = 1 << 9;
    }
}

bitflags! {
    /// Memory access types, used for dependencies and barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const COLOR_ATTACHMENT_READ = 1 << 2;
        const COLOR_ATTACHMENT_WRITE = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 5;
        const TRANSFER_READ = 1 << 6;
        const TRANSFER_WRITE = 1 << 7;
        const MEMORY_READ = 1 << 8;
        const MEMORY_WRITE = 1 << 9;
    }
}

/// Execution and memory dependency between subpasses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stage_mask: PipelineStageFlags,
    pub dst_stage_mask: PipelineStageFlags,
    pub src_access_mask: AccessFlags,
    pub dst_access_mask: AccessFlags,
    pub by_region: bool,
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDesc>,
    pub dependencies: Vec<SubpassDependency>,
}
