/// Off-screen render target - renders into sampled attachments
///
/// Same frame loop and state machine as the screen-bound target, without a
/// swapchain: no acquire, no present, no semaphores. Each frame slot has its
/// own attachment images and framebuffer, left in `ShaderReadOnlyOptimal`
/// for later passes (shadow maps, post-processing inputs).
///
/// Compute dispatches are recorded before the render pass. A target without
/// attachments is compute-only and records no render pass at all.

use std::sync::{Arc, Weak};

use crate::command::{record_compute_call, CommandBufferSet, ComputeCall, DrawBatch, SecondaryRecorder};
use crate::error::{Error, Result};
use crate::graphics_device::{
    AccessFlags, AttachmentReference, ClearValue, Extent2D, Framebuffer, FramebufferDesc,
    GraphicsDevice, Image, ImageUsage, PipelineStageFlags, QueueKind, RenderPass, RenderPassDesc,
    SampleCount, SubmitInfo, SubpassDependency, SubpassDesc, SubpassRef, TextureFormat,
};
use crate::pipeline::GraphicsPipeline;
use crate::target::{
    record_render_pass, rebuild_pipelines, AttachmentKind, FrameBegin, FrameSync, RenderTarget,
    RenderTargetAttachment, RenderTargetId, RenderTargetLayout, RenderTargetState,
    DEFAULT_CLEAR_COLOR, DEFAULT_CLEAR_DEPTH,
};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const SOURCE: &str = "flint3d::OffScreenRenderTarget";

/// Off-screen render target descriptor
#[derive(Debug, Clone)]
pub struct OffScreenRenderTargetDesc {
    pub name: String,
    pub extent: Extent2D,
    pub buffer_count: usize,
    /// One sampled color attachment per format (may be empty)
    pub color_formats: Vec<TextureFormat>,
    /// Sampled depth attachment format
    pub depth: Option<TextureFormat>,
    pub sample_count: SampleCount,
    pub worker_threads: usize,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

impl Default for OffScreenRenderTargetDesc {
    fn default() -> Self {
        Self {
            name: "offscreen".to_string(),
            extent: Extent2D::new(1024, 1024),
            buffer_count: 2,
            color_formats: vec![TextureFormat::R8G8B8A8_UNORM],
            depth: None,
            sample_count: SampleCount::S1,
            worker_threads: 0,
            clear_color: DEFAULT_CLEAR_COLOR,
            clear_depth: DEFAULT_CLEAR_DEPTH,
            clear_stencil: 0,
        }
    }
}

pub struct OffScreenRenderTarget<'d> {
    device: &'d dyn GraphicsDevice,
    id: RenderTargetId,
    name: String,
    state: RenderTargetState,
    buffer_count: usize,
    samples: SampleCount,
    worker_threads: usize,
    extent: Extent2D,
    pending_extent: Option<Extent2D>,
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: u32,
    frame_index: usize,
    frame_count: u64,
    recorded: bool,
    /// Slot whose submission failed after its fence was reset
    failed_slot: Option<usize>,
    recorder: Option<SecondaryRecorder>,
    commands: Option<CommandBufferSet>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    render_pass: Option<Arc<dyn RenderPass>>,
    attachments: Vec<RenderTargetAttachment>,
    sync: Option<FrameSync>,
    pipelines: Vec<Weak<GraphicsPipeline>>,
}

fn missing(what: &str) -> Error {
    Error::InvalidResource(format!("Off-screen target has no {} (not prepared or terminated)", what))
}

impl<'d> OffScreenRenderTarget<'d> {
    /// Create the attachments and primary command buffers
    pub fn new(device: &'d dyn GraphicsDevice, desc: OffScreenRenderTargetDesc) -> Result<Self> {
        if desc.buffer_count == 0 {
            engine_error!(SOURCE, "Render target '{}': buffer_count must be at least 1", desc.name);
            return Err(Error::InvalidResource("buffer_count must be at least 1".to_string()));
        }
        if desc.extent.is_zero() {
            engine_error!(SOURCE, "Render target '{}': initial extent {} is empty", desc.name, desc.extent);
            return Err(Error::InvalidResource(format!("Initial extent {} is empty", desc.extent)));
        }

        let samples = desc.sample_count.clamp_to(device.max_sample_count());
        if samples != desc.sample_count {
            engine_warn!(
                SOURCE,
                "Render target '{}': {}x MSAA not supported, using {}x",
                desc.name,
                desc.sample_count.count(),
                samples.count()
            );
        }

        let mut attachments = Vec::with_capacity(desc.color_formats.len() + 1);
        for format in &desc.color_formats {
            attachments.push(RenderTargetAttachment::create(
                device,
                AttachmentKind::Color,
                desc.extent,
                desc.buffer_count,
                *format,
                samples,
                ImageUsage::SAMPLED,
            )?);
        }
        if let Some(format) = desc.depth {
            attachments.push(RenderTargetAttachment::create(
                device,
                AttachmentKind::Depth,
                desc.extent,
                desc.buffer_count,
                format,
                samples,
                ImageUsage::SAMPLED,
            )?);
        }

        let commands = CommandBufferSet::new(device, QueueKind::Graphics, desc.buffer_count)?;

        engine_info!(
            SOURCE,
            "Render target '{}' created: {}, {} frame slots, {} attachments",
            desc.name,
            desc.extent,
            desc.buffer_count,
            attachments.len()
        );

        Ok(Self {
            device,
            id: RenderTargetId::next(),
            name: desc.name,
            state: RenderTargetState::Uninitialized,
            buffer_count: desc.buffer_count,
            samples,
            worker_threads: desc.worker_threads,
            extent: desc.extent,
            pending_extent: None,
            clear_color: desc.clear_color,
            clear_depth: desc.clear_depth,
            clear_stencil: desc.clear_stencil,
            frame_index: 0,
            frame_count: 0,
            recorded: false,
            failed_slot: None,
            recorder: None,
            commands: Some(commands),
            framebuffers: Vec::new(),
            render_pass: None,
            attachments,
            sync: None,
            pipelines: Vec::new(),
        })
    }

    /// Build the render pass, framebuffers, fences and worker pool
    pub fn prepare_static_resources(&mut self) -> Result<()> {
        if self.state != RenderTargetState::Uninitialized {
            engine_error!(SOURCE, "Render target '{}': static resources already prepared", self.name);
            return Err(Error::InvalidResource(format!(
                "Static resources of '{}' already prepared (state {:?})",
                self.name, self.state
            )));
        }

        self.build_render_pass()?;
        self.build_framebuffers()?;
        self.sync = Some(FrameSync::for_offscreen(self.device, self.buffer_count)?);
        if self.worker_threads > 0 && self.render_pass.is_some() {
            self.recorder = Some(SecondaryRecorder::new(self.device, self.worker_threads, self.buffer_count)?);
        }

        self.state = RenderTargetState::Ready;
        Ok(())
    }

    fn build_render_pass(&mut self) -> Result<()> {
        if self.attachments.is_empty() {
            return Ok(());
        }

        let mut color_attachments = Vec::new();
        let mut depth = None;
        for (index, attachment) in self.attachments.iter().enumerate() {
            let reference = AttachmentReference {
                attachment: index as u32,
                layout: attachment.attachment_layout(),
            };
            match attachment.kind() {
                AttachmentKind::Depth => depth = Some(reference),
                _ => color_attachments.push(reference),
            }
        }

        let attachment_writes = AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        let desc = RenderPassDesc {
            attachments: self.attachments.iter().map(|a| a.attachment_description()).collect(),
            subpasses: vec![SubpassDesc {
                color_attachments,
                resolve_attachments: Vec::new(),
                depth_stencil_attachment: depth,
            }],
            dependencies: vec![
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stage_mask: PipelineStageFlags::FRAGMENT_SHADER,
                    dst_stage_mask: PipelineStageFlags::EARLY_FRAGMENT_TESTS
                        | PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    src_access_mask: AccessFlags::SHADER_READ,
                    dst_access_mask: attachment_writes,
                    by_region: true,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::Index(0),
                    dst_subpass: SubpassRef::External,
                    src_stage_mask: PipelineStageFlags::LATE_FRAGMENT_TESTS
                        | PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    dst_stage_mask: PipelineStageFlags::FRAGMENT_SHADER,
                    src_access_mask: attachment_writes,
                    dst_access_mask: AccessFlags::SHADER_READ,
                    by_region: true,
                },
            ],
        };

        self.render_pass = Some(self.device.create_render_pass(&desc)?);
        Ok(())
    }

    fn build_framebuffers(&mut self) -> Result<()> {
        let Some(render_pass) = self.render_pass.as_ref() else {
            self.framebuffers.clear();
            return Ok(());
        };

        let mut framebuffers = Vec::with_capacity(self.buffer_count);
        for slot in 0..self.buffer_count {
            let attachments = self
                .attachments
                .iter()
                .map(|attachment| attachment.image(slot))
                .collect::<Option<Vec<&dyn Image>>>()
                .ok_or_else(|| missing("attachment image"))?;

            framebuffers.push(self.device.create_framebuffer(&FramebufferDesc {
                render_pass: render_pass.as_ref(),
                attachments,
                extent: self.extent,
            })?);
        }

        self.framebuffers = framebuffers;
        Ok(())
    }

    // ===== FRAME LOOP =====

    /// Open a frame: run a pending recreate and wait for the slot's fence
    ///
    /// # Returns
    ///
    /// `FrameBegin::Skipped` while a pending extent is zero.
    pub fn begin_frame(&mut self) -> Result<FrameBegin> {
        match self.state {
            RenderTargetState::Ready | RenderTargetState::NeedsRecreation => {}
            other => return Err(self.state_error("begin_frame", other)),
        }

        if self.state == RenderTargetState::NeedsRecreation || self.pending_extent.is_some() {
            if self.pending_extent.is_some_and(|extent| extent.is_zero()) {
                engine_trace!(SOURCE, "Render target '{}': zero extent, frame skipped", self.name);
                return Ok(FrameBegin::Skipped);
            }
            self.recreate()?;
        }

        let timeout = self.device.config().fence_timeout;
        let waited = self
            .sync
            .as_ref()
            .ok_or_else(|| missing("sync objects"))?
            .wait_slot(self.frame_index, timeout);
        waited.map_err(|e| self.fail(e))?;

        self.recorded = false;
        self.state = RenderTargetState::Recording;
        engine_trace!(SOURCE, "Frame {} begun: slot {}", self.frame_count, self.frame_index);
        Ok(FrameBegin::Ready)
    }

    /// Record compute dispatches, then the render pass with the draw batches
    ///
    /// After an error the frame stays open and unsubmittable until a later
    /// `update()` succeeds.
    pub fn update(&mut self, batches: &[DrawBatch], computes: &[ComputeCall]) -> Result<()> {
        if self.state != RenderTargetState::Recording {
            return Err(self.state_error("update", self.state));
        }
        self.recorded = false;

        let slot = self.frame_index;
        let pass = match &self.render_pass {
            Some(render_pass) => {
                let framebuffer = self.framebuffers.get(slot).cloned().ok_or_else(|| missing("framebuffer"))?;
                Some((render_pass.clone(), framebuffer))
            }
            None => None,
        };
        if pass.is_none() && batches.iter().any(|batch| !batch.is_empty()) {
            engine_error!(SOURCE, "Render target '{}' has no attachments to draw into", self.name);
            return Err(Error::InvalidResource(format!(
                "Render target '{}' is compute-only, draw batches are not allowed",
                self.name
            )));
        }
        let clear_values = self.clear_values();

        let cmd = self.commands.as_mut().ok_or_else(|| missing("command buffers"))?.primary_mut(slot)?;
        cmd.begin()?;
        for call in computes {
            record_compute_call(cmd, call)?;
        }
        if let Some((render_pass, framebuffer)) = &pass {
            record_render_pass(
                cmd,
                self.recorder.as_mut(),
                render_pass,
                framebuffer,
                self.extent,
                &clear_values,
                batches,
                slot,
                self.id,
            )?;
        }
        cmd.end()?;

        if pass.is_some() {
            for attachment in &mut self.attachments {
                let final_layout = attachment.attachment_description().final_layout;
                attachment.mark_layout(slot, final_layout);
            }
        }

        self.recorded = true;
        Ok(())
    }

    /// Submit the recorded frame (no semaphores) and advance the slot
    pub fn submit_frame(&mut self) -> Result<()> {
        if self.state != RenderTargetState::Recording {
            return Err(self.state_error("submit_frame", self.state));
        }
        if !self.recorded {
            engine_error!(SOURCE, "Render target '{}': submit_frame() without update()", self.name);
            return Err(Error::InvalidResource("submit_frame() called before update()".to_string()));
        }

        let slot = self.frame_index;
        if let Err(e) = self.submit_slot(slot) {
            self.failed_slot = Some(slot);
            self.recorded = false;
            self.state = RenderTargetState::NeedsRecreation;
            return Err(self.fail(e));
        }

        self.frame_index = (slot + 1) % self.buffer_count;
        self.frame_count += 1;
        self.recorded = false;
        self.state = RenderTargetState::Ready;
        engine_trace!(SOURCE, "Frame {} submitted: slot {}", self.frame_count - 1, slot);
        Ok(())
    }

    fn submit_slot(&self, slot: usize) -> Result<()> {
        let sync = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?;
        let commands = self.commands.as_ref().ok_or_else(|| missing("command buffers"))?;
        let fence = sync.in_flight(slot)?;
        let cmd = commands.primary(slot)?;

        fence.reset()?;
        self.device.submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_buffers: &[cmd],
            wait_semaphores: &[],
            signal_semaphores: &[],
            fence: Some(fence),
        })
    }

    // ===== RECREATION =====

    /// Rebuild the attachments at the pending extent
    ///
    /// Waits only for this target's own fences.
    pub fn recreate(&mut self) -> Result<()> {
        match self.state {
            RenderTargetState::Ready | RenderTargetState::NeedsRecreation => {}
            other => return Err(self.state_error("recreate", other)),
        }

        self.state = RenderTargetState::Recreating;
        match self.recreate_resources() {
            Ok(()) => {
                self.pending_extent = None;
                self.state = RenderTargetState::Ready;
                engine_info!(SOURCE, "Render target '{}' recreated at {}", self.name, self.extent);
                Ok(())
            }
            Err(e) => {
                self.state = if e.is_fatal() {
                    RenderTargetState::DeviceLost
                } else {
                    RenderTargetState::NeedsRecreation
                };
                engine_error!(SOURCE, "Render target '{}': recreate failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    /// Wait for every slot with a pending submission
    ///
    /// The fence of a slot whose submission failed was reset and will never
    /// signal, so that slot is skipped.
    fn wait_submitted(&self) -> Result<()> {
        let timeout = self.device.config().fence_timeout;
        let sync = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?;
        (0..sync.slot_count())
            .filter(|slot| Some(*slot) != self.failed_slot)
            .try_for_each(|slot| sync.wait_slot(slot, timeout))
    }

    fn recreate_resources(&mut self) -> Result<()> {
        self.wait_submitted()?;

        self.framebuffers.clear();
        self.render_pass = None;

        let extent = self.pending_extent.unwrap_or(self.extent);
        if extent.is_zero() {
            return Err(Error::InvalidResource(format!("Extent {} is empty", extent)));
        }
        for attachment in &mut self.attachments {
            attachment.recreate(self.device, extent)?;
        }
        self.extent = extent;

        // Fresh fences replace the one a failed submission left reset
        self.sync = Some(FrameSync::for_offscreen(self.device, self.buffer_count)?);
        self.failed_slot = None;
        self.build_render_pass()?;
        self.build_framebuffers()?;

        if self.render_pass.is_some() {
            let layout = self.layout()?;
            rebuild_pipelines(self.device, &mut self.pipelines, &layout)?;
        }
        Ok(())
    }

    /// Record a new extent; applied at the next `begin_frame()`
    pub fn notify_extent_changed(&mut self, extent: Extent2D) {
        if extent == self.extent {
            self.pending_extent = None;
            return;
        }
        if self.pending_extent != Some(extent) {
            engine_debug!(SOURCE, "Render target '{}': extent change to {} pending", self.name, extent);
            self.pending_extent = Some(extent);
        }
    }

    // ===== TEARDOWN =====

    /// Wait for this target's frames and release every resource (idempotent)
    pub fn terminate(&mut self) {
        if self.state == RenderTargetState::Terminated {
            return;
        }

        if self.sync.is_some() {
            if let Err(e) = self.wait_submitted() {
                engine_warn!(SOURCE, "Render target '{}': frames still in flight at terminate: {}", self.name, e);
            }
        }

        if let Some(mut recorder) = self.recorder.take() {
            recorder.shutdown();
        }
        self.commands = None;
        self.framebuffers.clear();
        self.render_pass = None;
        self.attachments.clear();
        self.sync = None;
        self.pipelines.clear();

        self.state = RenderTargetState::Terminated;
        engine_info!(SOURCE, "Render target '{}' terminated after {} frames", self.name, self.frame_count);
    }

    // ===== HELPERS =====

    fn fail(&mut self, error: Error) -> Error {
        if error.is_fatal() {
            self.state = RenderTargetState::DeviceLost;
            engine_error!(SOURCE, "Render target '{}' lost: {}", self.name, error);
        }
        error
    }

    fn state_error(&self, operation: &str, state: RenderTargetState) -> Error {
        if state == RenderTargetState::DeviceLost {
            return Error::DeviceLost(format!("Render target '{}' is lost", self.name));
        }
        engine_error!(SOURCE, "Render target '{}': {}() not allowed in state {:?}", self.name, operation, state);
        Error::InvalidResource(format!("{}() not allowed in state {:?}", operation, state))
    }

    fn clear_values(&self) -> Vec<ClearValue> {
        self.attachments
            .iter()
            .map(|attachment| match attachment.kind() {
                AttachmentKind::Depth => ClearValue::DepthStencil {
                    depth: self.clear_depth,
                    stencil: self.clear_stencil,
                },
                _ => ClearValue::Color(self.clear_color),
            })
            .collect()
    }

    // ===== ACCESSORS =====

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_depth(&mut self, depth: f32, stencil: u32) {
        self.clear_depth = depth;
        self.clear_stencil = stencil;
    }

    pub fn clear_depth(&self) -> (f32, u32) {
        (self.clear_depth, self.clear_stencil)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Attachments in render pass order (colors, then depth)
    pub fn attachments(&self) -> &[RenderTargetAttachment] {
        &self.attachments
    }

    /// Image of an attachment for a frame slot, for sampling in later passes
    pub fn image(&self, attachment: usize, slot: usize) -> Option<&dyn Image> {
        self.attachments.get(attachment).and_then(|a| a.image(slot))
    }
}

impl RenderTarget for OffScreenRenderTarget<'_> {
    fn id(&self) -> RenderTargetId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn frame_index(&self) -> usize {
        self.frame_index
    }

    fn state(&self) -> RenderTargetState {
        self.state
    }

    fn layout(&self) -> Result<RenderTargetLayout> {
        let render_pass = self.render_pass.clone().ok_or_else(|| missing("render pass"))?;
        let color_formats = self
            .attachments
            .iter()
            .filter(|attachment| attachment.kind() == AttachmentKind::Color)
            .map(RenderTargetAttachment::format)
            .collect();
        let depth_format = self
            .attachments
            .iter()
            .find(|attachment| attachment.kind() == AttachmentKind::Depth)
            .map(RenderTargetAttachment::format);

        Ok(RenderTargetLayout {
            render_pass,
            extent: self.extent,
            samples: self.samples,
            color_formats,
            depth_format,
        })
    }

    fn attach_pipeline(&mut self, pipeline: Weak<GraphicsPipeline>) {
        self.pipelines.retain(|existing| existing.strong_count() > 0);
        self.pipelines.push(pipeline);
    }
}

impl Drop for OffScreenRenderTarget<'_> {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
#[path = "offscreen_render_target_tests.rs"]
mod tests;
