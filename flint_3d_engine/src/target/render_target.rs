/// Render target - where a frame gets rendered to
///
/// Two implementations share this seam: `ScreenBoundRenderTarget`
/// (swapchain-backed, presented) and `OffScreenRenderTarget` (sampled
/// attachments, no presentation). Pipelines only see the trait: they are
/// built against a target's layout and registered with it so they can be
/// rebuilt when the target is recreated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::command::{record_draw_item, DrawBatch, SecondaryRecorder};
use crate::error::Result;
use crate::graphics_device::{
    ClearValue, CommandBuffer, Extent2D, Framebuffer, GraphicsDevice, InheritanceInfo, Rect2D,
    RenderPass, SampleCount, SubpassContents, TextureFormat,
};
use crate::pipeline::GraphicsPipeline;

/// Default clear color (dark grey)
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [32.0 / 255.0, 32.0 / 255.0, 32.0 / 255.0, 1.0];

/// Default depth clear value
pub const DEFAULT_CLEAR_DEPTH: f32 = 1.0;

/// Process-unique render target identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(u64);

impl RenderTargetId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetState {
    /// Created, static resources not prepared yet
    Uninitialized,
    /// Idle between frames
    Ready,
    /// Between `begin_frame()` and `submit_frame()`
    Recording,
    /// Inside the recreate sequence
    Recreating,
    /// A recreate failed; the next `begin_frame()` retries it
    NeedsRecreation,
    /// Fatal; every frame operation fails with `Error::DeviceLost`
    DeviceLost,
    /// Resources released
    Terminated,
}

/// Outcome of `begin_frame()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBegin {
    /// A frame is open: record with `update()`, then `submit_frame()`
    Ready,
    /// Nothing to render this frame (minimized window, swapchain out of date)
    Skipped,
}

/// What a pipeline needs to know about the target it renders into
#[derive(Clone)]
pub struct RenderTargetLayout {
    pub render_pass: Arc<dyn RenderPass>,
    pub extent: Extent2D,
    pub samples: SampleCount,
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
}

impl RenderTargetLayout {
    /// Same attachment formats and sample count (extent may differ)
    pub fn is_format_compatible(&self, other: &RenderTargetLayout) -> bool {
        self.samples == other.samples
            && self.color_formats == other.color_formats
            && self.depth_format == other.depth_format
    }
}

impl std::fmt::Debug for RenderTargetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTargetLayout")
            .field("extent", &self.extent)
            .field("samples", &self.samples)
            .field("color_formats", &self.color_formats)
            .field("depth_format", &self.depth_format)
            .finish()
    }
}

/// Common render target seam
pub trait RenderTarget {
    fn id(&self) -> RenderTargetId;

    fn name(&self) -> &str;

    /// Current extent in pixels
    fn extent(&self) -> Extent2D;

    /// Number of frames that may be in flight
    fn buffer_count(&self) -> usize;

    /// Current frame slot, in `[0, buffer_count)`
    fn frame_index(&self) -> usize;

    fn state(&self) -> RenderTargetState;

    /// Render pass, extent and formats pipelines are built against
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if the target has no render pass (not
    /// prepared, terminated, or an off-screen target without attachments).
    fn layout(&self) -> Result<RenderTargetLayout>;

    /// Register a pipeline to be rebuilt when the target is recreated
    fn attach_pipeline(&mut self, pipeline: Weak<GraphicsPipeline>);
}

/// Record one render pass worth of draw batches
///
/// Sequential when `recorder` is `None`, otherwise through the recorder's
/// workers with the primary executing their secondaries.
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_render_pass(
    cmd: &mut dyn CommandBuffer,
    recorder: Option<&mut SecondaryRecorder>,
    render_pass: &Arc<dyn RenderPass>,
    framebuffer: &Arc<dyn Framebuffer>,
    extent: Extent2D,
    clear_values: &[ClearValue],
    batches: &[DrawBatch],
    slot: usize,
    target: RenderTargetId,
) -> Result<()> {
    let area = Rect2D { x: 0, y: 0, width: extent.width, height: extent.height };
    let has_items = batches.iter().any(|batch| !batch.is_empty());

    match recorder {
        Some(recorder) if has_items => {
            cmd.begin_render_pass(
                render_pass.as_ref(),
                framebuffer.as_ref(),
                area,
                clear_values,
                SubpassContents::SecondaryCommandBuffers,
            )?;
            let inheritance = InheritanceInfo {
                render_pass: render_pass.clone(),
                framebuffer: framebuffer.clone(),
                subpass: 0,
            };
            let recorded = recorder.record(slot, &inheritance, batches, target, extent)?;
            if !recorded.is_empty() {
                cmd.execute_secondary(&recorded.buffers())?;
            }
        }
        _ => {
            cmd.begin_render_pass(
                render_pass.as_ref(),
                framebuffer.as_ref(),
                area,
                clear_values,
                SubpassContents::Inline,
            )?;
            for item in batches.iter().flat_map(|batch| batch.items.iter()) {
                record_draw_item(cmd, item, target, extent)?;
            }
        }
    }

    cmd.end_render_pass()
}

/// Drop registrations whose pipeline is gone, rebuild the rest
pub(crate) fn rebuild_pipelines(
    device: &dyn GraphicsDevice,
    pipelines: &mut Vec<Weak<GraphicsPipeline>>,
    layout: &RenderTargetLayout,
) -> Result<()> {
    pipelines.retain(|pipeline| pipeline.strong_count() > 0);
    for pipeline in pipelines.iter().filter_map(Weak::upgrade) {
        pipeline.rebuild(device, layout)?;
    }
    Ok(())
}
