/// Screen-bound render target - renders into swapchain images and presents
///
/// Frame loop:
///
/// ```text
/// begin_frame()  - wait the slot fence, acquire a swapchain image
/// update()       - record the slot's primary buffer (sequential or parallel)
/// submit_frame() - submit, present, advance the slot
/// ```
///
/// Resizes are deferred: `notify_extent_changed()` only records the new
/// extent and the recreate runs at the start of the next `begin_frame()`.

use std::sync::{Arc, Weak};

use crate::command::{CommandBufferSet, DrawBatch, SecondaryRecorder};
use crate::error::{Error, Result};
use crate::graphics_device::{
    AccessFlags, AttachmentReference, ClearValue, Extent2D, Framebuffer, FramebufferDesc,
    GraphicsDevice, Image, ImageUsage, PipelineStageFlags, PresentStatus, QueueKind,
    AcquireStatus, RenderPass, RenderPassDesc, SampleCount, SubmitInfo, SubpassDependency,
    SubpassDesc, SubpassRef, Swapchain, SwapchainDesc,
};
use crate::pipeline::GraphicsPipeline;
use crate::target::{
    record_render_pass, rebuild_pipelines, AttachmentKind, FrameBegin, FrameSync, RenderTarget,
    RenderTargetAttachment, RenderTargetId, RenderTargetLayout, RenderTargetState,
    DEFAULT_CLEAR_COLOR, DEFAULT_CLEAR_DEPTH,
};
use crate::{engine_debug, engine_error, engine_info, engine_trace, engine_warn};

const SOURCE: &str = "flint3d::ScreenBoundRenderTarget";

/// Attempts at acquiring an image before a frame is skipped
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// Screen-bound render target descriptor
#[derive(Debug, Clone)]
pub struct ScreenBoundRenderTargetDesc {
    pub name: String,
    /// Requested extent (the surface may impose another one)
    pub extent: Extent2D,
    /// Frames in flight, at least 1
    pub buffer_count: usize,
    /// Clamped to the device maximum; 1 means no multisampled color buffer
    pub sample_count: SampleCount,
    pub enable_depth: bool,
    /// Secondary recording threads (0 = record on the calling thread)
    pub worker_threads: usize,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

impl Default for ScreenBoundRenderTargetDesc {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            extent: Extent2D::new(1280, 720),
            buffer_count: 2,
            sample_count: SampleCount::S1,
            enable_depth: true,
            worker_threads: 0,
            clear_color: DEFAULT_CLEAR_COLOR,
            clear_depth: DEFAULT_CLEAR_DEPTH,
            clear_stencil: 0,
        }
    }
}

pub struct ScreenBoundRenderTarget<'d> {
    device: &'d dyn GraphicsDevice,
    id: RenderTargetId,
    name: String,
    state: RenderTargetState,
    buffer_count: usize,
    samples: SampleCount,
    worker_threads: usize,
    extent: Extent2D,
    pending_extent: Option<Extent2D>,
    recreate_requested: bool,
    clear_color: [f32; 4],
    clear_depth: f32,
    clear_stencil: u32,
    frame_index: usize,
    image_index: Option<u32>,
    frame_count: u64,
    recorded: bool,
    // Released by terminate() in this order
    recorder: Option<SecondaryRecorder>,
    commands: Option<CommandBufferSet>,
    /// Slot-major: index `slot * framebuffer_stride + image`
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    framebuffer_stride: usize,
    render_pass: Option<Arc<dyn RenderPass>>,
    attachments: Vec<RenderTargetAttachment>,
    swapchain: Option<Box<dyn Swapchain>>,
    sync: Option<FrameSync>,
    pipelines: Vec<Weak<GraphicsPipeline>>,
}

fn missing(what: &str) -> Error {
    Error::InvalidResource(format!("Render target has no {} (not prepared or terminated)", what))
}

impl<'d> ScreenBoundRenderTarget<'d> {
    /// Create the swapchain, attachments and primary command buffers
    ///
    /// Call `prepare_static_resources()` before the first frame.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` for a zero buffer count or extent; otherwise
    /// the device error of the failing creation.
    pub fn new(device: &'d dyn GraphicsDevice, desc: ScreenBoundRenderTargetDesc) -> Result<Self> {
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

        let swapchain = device.create_swapchain(&SwapchainDesc {
            extent: desc.extent,
            buffer_count: desc.buffer_count as u32,
        })?;
        let extent = swapchain.extent();
        let format = swapchain.format();

        let mut attachments = Vec::with_capacity(3);
        if samples.is_multisampled() {
            attachments.push(RenderTargetAttachment::create(
                device,
                AttachmentKind::Color,
                extent,
                desc.buffer_count,
                format,
                samples,
                ImageUsage::empty(),
            )?);
        }
        if desc.enable_depth {
            attachments.push(RenderTargetAttachment::create(
                device,
                AttachmentKind::Depth,
                extent,
                desc.buffer_count,
                device.find_depth_format()?,
                samples,
                ImageUsage::empty(),
            )?);
        }
        attachments.push(RenderTargetAttachment::create(
            device,
            AttachmentKind::Swapchain { resolve: samples.is_multisampled() },
            extent,
            desc.buffer_count,
            format,
            SampleCount::S1,
            ImageUsage::empty(),
        )?);

        let commands = CommandBufferSet::new(device, QueueKind::Graphics, desc.buffer_count)?;

        engine_info!(
            SOURCE,
            "Render target '{}' created: {}, {} frame slots, {} swapchain images, {}x MSAA",
            desc.name,
            extent,
            desc.buffer_count,
            swapchain.image_count(),
            samples.count()
        );

        Ok(Self {
            device,
            id: RenderTargetId::next(),
            name: desc.name,
            state: RenderTargetState::Uninitialized,
            buffer_count: desc.buffer_count,
            samples,
            worker_threads: desc.worker_threads,
            extent,
            pending_extent: None,
            recreate_requested: false,
            clear_color: desc.clear_color,
            clear_depth: desc.clear_depth,
            clear_stencil: desc.clear_stencil,
            frame_index: 0,
            image_index: None,
            frame_count: 0,
            recorded: false,
            recorder: None,
            commands: Some(commands),
            framebuffers: Vec::new(),
            framebuffer_stride: 0,
            render_pass: None,
            attachments,
            swapchain: Some(swapchain),
            sync: None,
            pipelines: Vec::new(),
        })
    }

    /// Build the render pass, framebuffers, sync objects and worker pool
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if called more than once.
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
        self.build_sync()?;
        if self.worker_threads > 0 {
            self.recorder = Some(SecondaryRecorder::new(self.device, self.worker_threads, self.buffer_count)?);
        }

        self.state = RenderTargetState::Ready;
        engine_debug!(
            SOURCE,
            "Render target '{}' prepared: {} framebuffers, {} recording threads",
            self.name,
            self.framebuffers.len(),
            self.worker_threads
        );
        Ok(())
    }

    fn build_render_pass(&mut self) -> Result<()> {
        let mut color = None;
        let mut resolve = None;
        let mut depth = None;
        for (index, attachment) in self.attachments.iter().enumerate() {
            let reference = AttachmentReference {
                attachment: index as u32,
                layout: attachment.attachment_layout(),
            };
            match attachment.kind() {
                AttachmentKind::Color => color = Some(reference),
                AttachmentKind::Depth => depth = Some(reference),
                AttachmentKind::Swapchain { resolve: true } => resolve = Some(reference),
                AttachmentKind::Swapchain { resolve: false } => color = Some(reference),
            }
        }

        let attachment_writes = AccessFlags::COLOR_ATTACHMENT_READ
            | AccessFlags::COLOR_ATTACHMENT_WRITE
            | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        let desc = RenderPassDesc {
            attachments: self.attachments.iter().map(|a| a.attachment_description()).collect(),
            subpasses: vec![SubpassDesc {
                color_attachments: color.into_iter().collect(),
                resolve_attachments: resolve.into_iter().collect(),
                depth_stencil_attachment: depth,
            }],
            dependencies: vec![
                // The layout transition of the acquired image must also wait
                // for the image-available semaphore (waited at color output)
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stage_mask: PipelineStageFlags::BOTTOM_OF_PIPE
                        | PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    dst_stage_mask: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                    src_access_mask: AccessFlags::MEMORY_READ,
                    dst_access_mask: attachment_writes,
                    by_region: true,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::Index(0),
                    dst_subpass: SubpassRef::External,
                    src_stage_mask: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | PipelineStageFlags::EARLY_FRAGMENT_TESTS
                        | PipelineStageFlags::LATE_FRAGMENT_TESTS,
                    dst_stage_mask: PipelineStageFlags::BOTTOM_OF_PIPE,
                    src_access_mask: attachment_writes,
                    dst_access_mask: AccessFlags::MEMORY_READ,
                    by_region: true,
                },
            ],
        };

        self.render_pass = Some(self.device.create_render_pass(&desc)?);
        Ok(())
    }

    /// One framebuffer per (frame slot, swapchain image) pair
    ///
    /// Owned attachments are indexed by slot, so two frames in flight never
    /// share a depth or multisampled color image: a slot's images are reused
    /// only after its fence was waited.
    fn build_framebuffers(&mut self) -> Result<()> {
        let render_pass = self.render_pass.as_ref().ok_or_else(|| missing("render pass"))?;
        let swapchain = self.swapchain.as_ref().ok_or_else(|| missing("swapchain"))?;
        let image_count = swapchain.image_count();

        let mut framebuffers = Vec::with_capacity(self.buffer_count * image_count);
        for slot in 0..self.buffer_count {
            for image_index in 0..image_count {
                let attachments = self
                    .attachments
                    .iter()
                    .map(|attachment| match attachment.kind() {
                        AttachmentKind::Swapchain { .. } => swapchain.image(image_index),
                        _ => attachment.image(slot),
                    })
                    .collect::<Option<Vec<&dyn Image>>>()
                    .ok_or_else(|| missing("attachment image"))?;

                framebuffers.push(self.device.create_framebuffer(&FramebufferDesc {
                    render_pass: render_pass.as_ref(),
                    attachments,
                    extent: self.extent,
                })?);
            }
        }

        self.framebuffers = framebuffers;
        self.framebuffer_stride = image_count;
        Ok(())
    }

    fn framebuffer(&self, slot: usize, image: usize) -> Result<Arc<dyn Framebuffer>> {
        self.framebuffers
            .get(slot * self.framebuffer_stride + image)
            .cloned()
            .ok_or_else(|| missing("framebuffer"))
    }

    fn build_sync(&mut self) -> Result<()> {
        let swapchain = self.swapchain.as_ref().ok_or_else(|| missing("swapchain"))?;
        // Replaced wholesale, so any fence reset by an aborted submission is gone too
        self.sync = Some(FrameSync::for_swapchain(self.device, self.buffer_count, swapchain.image_count())?);
        Ok(())
    }

    // ===== FRAME LOOP =====

    /// Open a frame
    ///
    /// Runs a pending recreate, waits for the current slot's fence and
    /// acquires the next swapchain image.
    ///
    /// # Returns
    ///
    /// `FrameBegin::Skipped` when there is nothing to render: the extent is
    /// zero (minimized window) or the swapchain stayed out of date.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if not prepared, terminated, or a frame is
    ///   already open
    /// - `Error::DeviceLost` on fence timeout or device/surface loss
    /// - the recreate error if a pending recreate fails
    pub fn begin_frame(&mut self) -> Result<FrameBegin> {
        match self.state {
            RenderTargetState::Ready | RenderTargetState::NeedsRecreation => {}
            other => return Err(self.state_error("begin_frame", other)),
        }

        let needs_recreate = self.state == RenderTargetState::NeedsRecreation
            || self.pending_extent.is_some()
            || self.recreate_requested;
        if needs_recreate {
            let requested = self.pending_extent.unwrap_or(self.extent);
            if requested.is_zero() {
                engine_trace!(SOURCE, "Render target '{}': zero extent, frame skipped", self.name);
                return Ok(FrameBegin::Skipped);
            }
            self.recreate()?;
        }

        let slot = self.frame_index;
        let timeout = self.device.config().fence_timeout;
        let waited = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?.wait_slot(slot, timeout);
        waited.map_err(|e| self.fail(e))?;

        let mut acquired = None;
        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            let status = {
                let swapchain = self.swapchain.as_mut().ok_or_else(|| missing("swapchain"))?;
                let sync = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?;
                swapchain.acquire_next_image(sync.image_available(slot)?, timeout)
            };

            match status.map_err(|e| self.fail(e))? {
                AcquireStatus::Acquired { index, suboptimal } => {
                    if suboptimal {
                        engine_warn!(SOURCE, "Render target '{}': suboptimal swapchain, recreate scheduled", self.name);
                        self.recreate_requested = true;
                    }
                    acquired = Some(index);
                    break;
                }
                AcquireStatus::OutOfDate => {
                    engine_debug!(
                        SOURCE,
                        "Render target '{}': swapchain out of date at acquire (attempt {}/{})",
                        self.name,
                        attempt,
                        MAX_ACQUIRE_ATTEMPTS
                    );
                    self.recreate()?;
                }
            }
        }

        let Some(index) = acquired else {
            engine_warn!(
                SOURCE,
                "Render target '{}': swapchain still out of date after {} attempts, frame skipped",
                self.name,
                MAX_ACQUIRE_ATTEMPTS
            );
            self.recreate_requested = true;
            return Ok(FrameBegin::Skipped);
        };

        // Another slot may still be rendering to this image
        let claimed = self
            .sync
            .as_mut()
            .ok_or_else(|| missing("sync objects"))?
            .claim_image(index as usize, slot, timeout);
        claimed.map_err(|e| self.fail(e))?;

        self.image_index = Some(index);
        self.recorded = false;
        self.state = RenderTargetState::Recording;
        engine_trace!(SOURCE, "Frame {} begun: slot {}, image {}", self.frame_count, slot, index);
        Ok(FrameBegin::Ready)
    }

    /// Record the frame's draw batches into the slot's primary buffer
    ///
    /// With worker threads the batches are recorded into secondaries in
    /// parallel and executed from the primary, in batch order.
    ///
    /// # Errors
    ///
    /// A recording error leaves the frame open in `Recording` with nothing
    /// submittable: `update()` may be called again (the primary is begun
    /// afresh), and `submit_frame()` refuses the frame until one succeeds.
    pub fn update(&mut self, batches: &[DrawBatch]) -> Result<()> {
        if self.state != RenderTargetState::Recording {
            return Err(self.state_error("update", self.state));
        }
        self.recorded = false;

        let slot = self.frame_index;
        let image = self.image_index.ok_or_else(|| missing("acquired image"))? as usize;
        let render_pass = self.render_pass.clone().ok_or_else(|| missing("render pass"))?;
        let framebuffer = self.framebuffer(slot, image)?;
        let clear_values = self.clear_values();

        let cmd = self.commands.as_mut().ok_or_else(|| missing("command buffers"))?.primary_mut(slot)?;
        cmd.begin()?;
        record_render_pass(
            cmd,
            self.recorder.as_mut(),
            &render_pass,
            &framebuffer,
            self.extent,
            &clear_values,
            batches,
            slot,
            self.id,
        )?;
        cmd.end()?;

        for attachment in &mut self.attachments {
            let final_layout = attachment.attachment_description().final_layout;
            attachment.mark_layout(slot, final_layout);
        }

        self.recorded = true;
        engine_trace!(
            SOURCE,
            "Frame {} recorded: {} draw items",
            self.frame_count,
            batches.iter().map(DrawBatch::len).sum::<usize>()
        );
        Ok(())
    }

    /// Submit the recorded frame and present it
    ///
    /// Advances the frame slot once the submission succeeded, whatever the
    /// present outcome. Suboptimal and out-of-date presents schedule a
    /// recreate for the next frame.
    pub fn submit_frame(&mut self) -> Result<()> {
        if self.state != RenderTargetState::Recording {
            return Err(self.state_error("submit_frame", self.state));
        }
        if !self.recorded {
            engine_error!(SOURCE, "Render target '{}': submit_frame() without update()", self.name);
            return Err(Error::InvalidResource("submit_frame() called before update()".to_string()));
        }

        let slot = self.frame_index;
        let image = self.image_index.ok_or_else(|| missing("acquired image"))?;

        if let Err(e) = self.submit_slot(slot, image as usize) {
            // The slot fence may be reset without a pending signal; the
            // recreate replaces every sync object
            self.image_index = None;
            self.recorded = false;
            self.state = RenderTargetState::NeedsRecreation;
            return Err(self.fail(e));
        }

        let presented = {
            let swapchain = self.swapchain.as_ref().ok_or_else(|| missing("swapchain"))?;
            let sync = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?;
            let request = swapchain.prepare_to_present(image, sync.render_finished(image as usize)?);
            self.device.present(&request)
        };

        self.frame_index = (slot + 1) % self.buffer_count;
        self.frame_count += 1;
        self.image_index = None;
        self.recorded = false;
        self.state = RenderTargetState::Ready;

        match presented {
            Ok(PresentStatus::Optimal) => {}
            Ok(status) => {
                engine_warn!(SOURCE, "Render target '{}': present returned {:?}, recreate scheduled", self.name, status);
                self.recreate_requested = true;
            }
            Err(e) => {
                self.recreate_requested = true;
                return Err(self.fail(e));
            }
        }

        engine_trace!(SOURCE, "Frame {} submitted: slot {}, image {}", self.frame_count - 1, slot, image);
        Ok(())
    }

    fn submit_slot(&self, slot: usize, image: usize) -> Result<()> {
        let sync = self.sync.as_ref().ok_or_else(|| missing("sync objects"))?;
        let commands = self.commands.as_ref().ok_or_else(|| missing("command buffers"))?;
        let fence = sync.in_flight(slot)?;
        let cmd = commands.primary(slot)?;

        fence.reset()?;
        self.device.submit(&SubmitInfo {
            queue: QueueKind::Graphics,
            command_buffers: &[cmd],
            wait_semaphores: &[(sync.image_available(slot)?, PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)],
            signal_semaphores: &[sync.render_finished(image)?],
            fence: Some(fence),
        })
    }

    // ===== RECREATION =====

    /// Rebuild everything that depends on the swapchain extent
    ///
    /// Order: wait for the device, release framebuffers and render pass,
    /// recreate attachments, recreate the swapchain, rebuild render pass and
    /// framebuffers, rebuild registered pipelines. On failure the target is
    /// left in `NeedsRecreation` and the next `begin_frame()` retries.
    pub fn recreate(&mut self) -> Result<()> {
        match self.state {
            RenderTargetState::Ready | RenderTargetState::NeedsRecreation => {}
            other => return Err(self.state_error("recreate", other)),
        }

        self.state = RenderTargetState::Recreating;
        match self.recreate_resources() {
            Ok(()) => {
                self.pending_extent = None;
                self.recreate_requested = false;
                self.state = RenderTargetState::Ready;
                engine_info!(SOURCE, "Render target '{}' recreated at {}", self.name, self.extent);
                Ok(())
            }
            Err(e) => {
                if e.is_fatal() {
                    self.state = RenderTargetState::DeviceLost;
                } else {
                    self.state = RenderTargetState::NeedsRecreation;
                }
                engine_error!(SOURCE, "Render target '{}': recreate failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    fn recreate_resources(&mut self) -> Result<()> {
        self.device.wait_idle()?;

        self.framebuffers.clear();
        self.render_pass = None;

        let requested = self.pending_extent.unwrap_or(self.extent);
        let extent = self.swapchain.as_ref().ok_or_else(|| missing("swapchain"))?.resolve_extent(requested)?;
        if extent.is_zero() {
            return Err(Error::InvalidResource(format!("Surface extent {} is empty", extent)));
        }

        for attachment in &mut self.attachments {
            attachment.recreate(self.device, extent)?;
        }

        let swapchain = self.swapchain.as_mut().ok_or_else(|| missing("swapchain"))?;
        swapchain.recreate(extent)?;
        self.extent = swapchain.extent();
        self.build_sync()?;

        self.build_render_pass()?;
        self.build_framebuffers()?;

        let layout = self.layout()?;
        rebuild_pipelines(self.device, &mut self.pipelines, &layout)
    }

    /// Record a new window extent; applied at the next `begin_frame()`
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

    /// Wait for the device and release every resource (idempotent)
    pub fn terminate(&mut self) {
        if self.state == RenderTargetState::Terminated {
            return;
        }

        if let Err(e) = self.device.wait_idle() {
            engine_warn!(SOURCE, "Render target '{}': wait_idle failed during terminate: {}", self.name, e);
        }

        if let Some(mut recorder) = self.recorder.take() {
            recorder.shutdown();
        }
        self.commands = None;
        self.framebuffers.clear();
        self.render_pass = None;
        self.attachments.clear();
        self.swapchain = None;
        self.sync = None;
        self.pipelines.clear();
        self.image_index = None;

        self.state = RenderTargetState::Terminated;
        engine_info!(SOURCE, "Render target '{}' terminated after {} frames", self.name, self.frame_count);
    }

    // ===== HELPERS =====

    /// Classify an error: fatal ones move the target to `DeviceLost`
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

    /// Depth and stencil clear values
    pub fn clear_depth(&self) -> (f32, u32) {
        (self.clear_depth, self.clear_stencil)
    }

    /// Swapchain image of the open frame
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    /// Frames submitted so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn sample_count(&self) -> SampleCount {
        self.samples
    }

    /// Attachments in render pass order
    pub fn attachments(&self) -> &[RenderTargetAttachment] {
        &self.attachments
    }

    pub fn swapchain(&self) -> Option<&dyn Swapchain> {
        self.swapchain.as_deref()
    }

    pub fn pending_extent(&self) -> Option<Extent2D> {
        self.pending_extent
    }
}

impl RenderTarget for ScreenBoundRenderTarget<'_> {
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
        let swapchain = self.swapchain.as_ref().ok_or_else(|| missing("swapchain"))?;
        let depth_format = self
            .attachments
            .iter()
            .find(|attachment| attachment.kind() == AttachmentKind::Depth)
            .map(RenderTargetAttachment::format);

        Ok(RenderTargetLayout {
            render_pass,
            extent: self.extent,
            samples: self.samples,
            color_formats: vec![swapchain.format()],
            depth_format,
        })
    }

    fn attach_pipeline(&mut self, pipeline: Weak<GraphicsPipeline>) {
        self.pipelines.retain(|existing| existing.strong_count() > 0);
        self.pipelines.push(pipeline);
    }
}

impl Drop for ScreenBoundRenderTarget<'_> {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
#[path = "screen_bound_render_target_tests.rs"]
mod tests;
