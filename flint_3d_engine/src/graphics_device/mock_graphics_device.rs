/// Mock graphics device for unit tests (no GPU required)
///
/// Every object records what happens to it into one ordered event log shared
/// by the whole device, so tests can assert on creation, destruction,
/// submission and presentation order. Command buffers additionally keep
/// their own command stream.
///
/// GPU latency is simulated with timer threads that signal fences after a
/// configurable delay; hung submissions never signal.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted outcome of the next `acquire_next_image`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAcquire {
    Image(u32),
    Suboptimal(u32),
    OutOfDate,
    SurfaceLost,
}

// ============================================================================
// Shared state
// ============================================================================

struct MockState {
    events: Mutex<Vec<String>>,
    next_id: AtomicU64,
    submit_delay: Mutex<Option<Duration>>,
    hang_submits: AtomicBool,
    hung_submits: AtomicU32,
    pending_signals: Mutex<u32>,
    idle: Condvar,
    acquire_script: Mutex<VecDeque<MockAcquire>>,
    present_script: Mutex<VecDeque<PresentStatus>>,
    image_failures: AtomicU32,
    submit_failures: AtomicU32,
    draw_failures: AtomicU32,
    surface_extent: Mutex<Option<Extent2D>>,
    min_image_count: AtomicU32,
    command_logs: Mutex<FxHashMap<u64, Arc<Mutex<Vec<String>>>>>,
}

impl MockState {
    fn push(&self, event: String) {
        lock(&self.events).push(event);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn capabilities(&self) -> SurfaceCapabilities {
        let current = lock(&self.surface_extent)
            .unwrap_or(Extent2D::new(UNDEFINED_EXTENT, UNDEFINED_EXTENT));
        SurfaceCapabilities {
            min_image_count: self.min_image_count.load(Ordering::SeqCst),
            max_image_count: 8,
            current_extent: current,
            min_image_extent: Extent2D::new(1, 1),
            max_image_extent: Extent2D::new(16384, 16384),
            supported_composite_alpha: CompositeAlphaFlags::OPAQUE,
        }
    }
}

// ============================================================================
// Mock device
// ============================================================================

pub struct MockGraphicsDevice {
    config: Config,
    max_samples: SampleCount,
    state: Arc<MockState>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        let config = Config {
            fence_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            max_samples: SampleCount::S8,
            state: Arc::new(MockState {
                events: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                submit_delay: Mutex::new(None),
                hang_submits: AtomicBool::new(false),
                hung_submits: AtomicU32::new(0),
                pending_signals: Mutex::new(0),
                idle: Condvar::new(),
                acquire_script: Mutex::new(VecDeque::new()),
                present_script: Mutex::new(VecDeque::new()),
                image_failures: AtomicU32::new(0),
                submit_failures: AtomicU32::new(0),
                draw_failures: AtomicU32::new(0),
                surface_extent: Mutex::new(None),
                min_image_count: AtomicU32::new(2),
                command_logs: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    pub fn with_max_samples(mut self, samples: SampleCount) -> Self {
        self.max_samples = samples;
        self
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<String> {
        lock(&self.state.events).clone()
    }

    pub fn clear_events(&self) {
        lock(&self.state.events).clear();
    }

    /// Number of events starting with `prefix`
    pub fn count_events(&self, prefix: &str) -> usize {
        lock(&self.state.events).iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// Delay between a submission and the signal of its fence
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        *lock(&self.state.submit_delay) = delay;
    }

    /// Submissions made while set never signal their fence
    pub fn set_hang_submits(&self, hang: bool) {
        self.state.hang_submits.store(hang, Ordering::SeqCst);
    }

    /// Queue outcomes for upcoming acquisitions (round-robin indices once exhausted)
    pub fn script_acquire(&self, results: impl IntoIterator<Item = MockAcquire>) {
        lock(&self.state.acquire_script).extend(results);
    }

    /// Queue outcomes for upcoming presentations (`Optimal` once exhausted)
    pub fn script_present(&self, results: impl IntoIterator<Item = PresentStatus>) {
        lock(&self.state.present_script).extend(results);
    }

    /// Make the next `count` attachment image creations fail
    pub fn fail_next_image_creations(&self, count: u32) {
        self.state.image_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` submissions fail with `Error::OutOfMemory`
    pub fn fail_next_submits(&self, count: u32) {
        self.state.submit_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` recorded draws fail with `Error::BackendError`
    pub fn fail_next_draws(&self, count: u32) {
        self.state.draw_failures.store(count, Ordering::SeqCst);
    }

    /// Extent the surface reports (`None` lets the swapchain decide)
    pub fn set_surface_extent(&self, extent: Option<Extent2D>) {
        *lock(&self.state.surface_extent) = extent;
    }

    pub fn set_min_image_count(&self, count: u32) {
        self.state.min_image_count.store(count, Ordering::SeqCst);
    }

    /// Latest recording of a command buffer
    pub fn commands(&self, command_buffer_id: u64) -> Vec<String> {
        lock(&self.state.command_logs)
            .get(&command_buffer_id)
            .map(|log| lock(log).clone())
            .unwrap_or_default()
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn config(&self) -> &Config {
        &self.config
    }

    fn max_sample_count(&self) -> SampleCount {
        self.max_samples
    }

    fn find_depth_format(&self) -> Result<TextureFormat> {
        Ok(TextureFormat::D32_SFLOAT)
    }

    fn create_attachment_image(&self, desc: &ImageDesc) -> Result<Box<dyn Image>> {
        let failures = self.state.image_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.state.image_failures.store(failures - 1, Ordering::SeqCst);
            self.state.push("create_image_failed".to_string());
            return Err(Error::ResourceCreationFailed("mock image creation failure".to_string()));
        }
        if desc.samples > self.max_samples {
            return Err(Error::ResourceCreationFailed(format!(
                "{:?} exceeds the device maximum {:?}",
                desc.samples, self.max_samples
            )));
        }

        let id = self.state.next_id();
        self.state.push(format!("create_image:{}:{}:{}", id, desc.extent, desc.samples.count()));
        Ok(Box::new(MockImage {
            label: format!("image{}", id),
            id: Some(id),
            desc: *desc,
            state: self.state.clone(),
        }))
    }

    fn transition_image_layouts(
        &self,
        images: &[&dyn Image],
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        let labels: Vec<&str> = images.iter().map(|image| image_label(*image)).collect();
        self.state.push(format!(
            "transition:{}:{:?}->{:?}",
            labels.join(","),
            old_layout,
            new_layout
        ));
        Ok(())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        let id = self.state.next_id();
        let mut swapchain = MockSwapchain {
            id,
            buffer_count: desc.buffer_count,
            extent: Extent2D::default(),
            images: Vec::new(),
            next_index: 0,
            state: self.state.clone(),
        };
        swapchain.build(desc.extent);
        self.state.push(format!("create_swapchain:{}:{}", id, swapchain.extent));
        Ok(Box::new(swapchain))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        let id = self.state.next_id();
        self.state.push(format!("create_render_pass:{}:{}", id, desc.attachments.len()));
        Ok(Arc::new(MockRenderPass {
            id,
            desc: desc.clone(),
            state: self.state.clone(),
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        if desc.attachments.len() != desc.render_pass.attachment_count() {
            return Err(Error::ResourceCreationFailed(format!(
                "framebuffer has {} attachments, render pass expects {}",
                desc.attachments.len(),
                desc.render_pass.attachment_count()
            )));
        }
        let id = self.state.next_id();
        let labels: Vec<&str> = desc.attachments.iter().map(|image| image_label(*image)).collect();
        let label = labels.join(",");
        self.state.push(format!("create_framebuffer:{}:{}", id, label));
        Ok(Arc::new(MockFramebuffer {
            id,
            label,
            extent: desc.extent,
            state: self.state.clone(),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        let id = self.state.next_id();
        self.state.push(format!("create_fence:{}", id));
        Ok(Box::new(MockFence {
            id,
            signal: Arc::new((Mutex::new(signaled), Condvar::new())),
            state: self.state.clone(),
        }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn GpuSemaphore>> {
        Ok(Box::new(MockSemaphore { _id: self.state.next_id() }))
    }

    fn create_command_pool(&self, queue: QueueKind) -> Result<Box<dyn CommandPool>> {
        let id = self.state.next_id();
        self.state.push(format!("create_command_pool:{}:{:?}", id, queue));
        Ok(Box::new(MockCommandPool { id, state: self.state.clone() }))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(MockBuffer {
            id: self.state.next_id(),
            data: Mutex::new(vec![0; desc.size as usize]),
        }))
    }

    fn create_pipeline_cache(&self, initial_data: &[u8]) -> Result<Box<dyn PipelineCache>> {
        Ok(Box::new(MockPipelineCache { data: initial_data.to_vec() }))
    }

    fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Arc<dyn PipelineObject>> {
        let cached = info
            .cache
            .and_then(|cache| cache.as_any().downcast_ref::<MockPipelineCache>())
            .map_or(0, |cache| cache.data.len());
        self.state.push(format!(
            "create_graphics_pipeline:{}:{}:{}:cache={}",
            info.name,
            info.extent,
            info.samples.count(),
            cached
        ));
        Ok(Arc::new(MockPipelineObject {
            name: info.name.to_string(),
            bind_point: PipelineBindPoint::Graphics,
            state: self.state.clone(),
        }))
    }

    fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Arc<dyn PipelineObject>> {
        self.state.push(format!("create_compute_pipeline:{}", info.name));
        Ok(Arc::new(MockPipelineObject {
            name: info.name.to_string(),
            bind_point: PipelineBindPoint::Compute,
            state: self.state.clone(),
        }))
    }

    fn create_resource_package(
        &self,
        _pipeline: &dyn PipelineObject,
        set: u32,
        _bindings: &[ResourceBinding],
    ) -> Result<Arc<dyn ResourcePackage>> {
        Ok(Arc::new(MockResourcePackage { id: self.state.next_id(), set }))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        let failures = self.state.submit_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.state.submit_failures.store(failures - 1, Ordering::SeqCst);
            self.state.push("submit_failed".to_string());
            return Err(Error::OutOfMemory);
        }

        let cmds: Vec<String> = info
            .command_buffers
            .iter()
            .map(|cmd| mock_command_buffer_id(*cmd).to_string())
            .collect();
        let fence = info
            .fence
            .and_then(|fence| fence.as_any().downcast_ref::<MockFence>());

        self.state.push(format!(
            "submit:{:?}:fence={}:cmds={}:waits={}:signals={}",
            info.queue,
            fence.map_or_else(|| "none".to_string(), |f| f.id.to_string()),
            cmds.join(","),
            info.wait_semaphores.len(),
            info.signal_semaphores.len()
        ));

        let Some(fence) = fence else {
            return Ok(());
        };

        if self.state.hang_submits.load(Ordering::SeqCst) {
            self.state.hung_submits.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        let delay = *lock(&self.state.submit_delay);
        match delay {
            None => signal_fence(&self.state, fence.id, &fence.signal),
            Some(delay) => {
                *lock(&self.state.pending_signals) += 1;
                let state = self.state.clone();
                let signal = fence.signal.clone();
                let id = fence.id;
                thread::spawn(move || {
                    thread::sleep(delay);
                    signal_fence(&state, id, &signal);
                    let mut pending = lock(&state.pending_signals);
                    *pending -= 1;
                    state.idle.notify_all();
                });
            }
        }
        Ok(())
    }

    fn present(&self, request: &PresentRequest) -> Result<PresentStatus> {
        let status = lock(&self.state.present_script)
            .pop_front()
            .unwrap_or(PresentStatus::Optimal);
        self.state.push(format!("present:{}:{:?}", request.image_index, status));
        Ok(status)
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.push("wait_idle".to_string());
        let mut pending = lock(&self.state.pending_signals);
        while *pending > 0 {
            pending = self.state.idle.wait(pending).unwrap_or_else(PoisonError::into_inner);
        }
        if self.state.hung_submits.load(Ordering::SeqCst) > 0 {
            return Err(Error::DeviceLost("mock device hung".to_string()));
        }
        Ok(())
    }
}

fn signal_fence(state: &MockState, id: u64, signal: &(Mutex<bool>, Condvar)) {
    state.push(format!("fence_signaled:{}", id));
    *lock(&signal.0) = true;
    signal.1.notify_all();
}

fn image_label(image: &dyn Image) -> &str {
    image
        .as_any()
        .downcast_ref::<MockImage>()
        .map_or("?", |image| image.label.as_str())
}

fn mock_command_buffer_id(cmd: &dyn CommandBuffer) -> u64 {
    cmd.as_any().downcast_ref::<MockCommandBuffer>().map_or(0, |cmd| cmd.id)
}

// ============================================================================
// Mock Image
// ============================================================================

pub struct MockImage {
    /// `None` for swapchain images (owned by the swapchain, no events)
    id: Option<u64>,
    label: String,
    desc: ImageDesc,
    state: Arc<MockState>,
}

impl MockImage {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Image for MockImage {
    fn extent(&self) -> Extent2D {
        self.desc.extent
    }

    fn format(&self) -> TextureFormat {
        self.desc.format
    }

    fn samples(&self) -> SampleCount {
        self.desc.samples
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockImage {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.state.push(format!("destroy_image:{}", id));
        }
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    id: u64,
    buffer_count: u32,
    extent: Extent2D,
    images: Vec<MockImage>,
    next_index: u32,
    state: Arc<MockState>,
}

impl MockSwapchain {
    fn build(&mut self, requested: Extent2D) {
        let capabilities = self.state.capabilities();
        self.extent = choose_extent(&capabilities, requested);
        let count = choose_image_count(&capabilities, self.buffer_count);
        self.images = (0..count)
            .map(|i| MockImage {
                id: None,
                label: format!("swapchain[{}]", i),
                desc: ImageDesc {
                    extent: self.extent,
                    format: TextureFormat::B8G8R8A8_UNORM,
                    samples: SampleCount::S1,
                    usage: ImageUsage::COLOR_ATTACHMENT,
                },
                state: self.state.clone(),
            })
            .collect();
        self.next_index = 0;
    }
}

impl Swapchain for MockSwapchain {
    fn resolve_extent(&self, requested: Extent2D) -> Result<Extent2D> {
        Ok(choose_extent(&self.state.capabilities(), requested))
    }

    fn acquire_next_image(&mut self, _signal: &dyn GpuSemaphore, _timeout: Duration) -> Result<AcquireStatus> {
        let scripted = lock(&self.state.acquire_script).pop_front();
        let count = self.images.len() as u32;
        let status = match scripted {
            Some(MockAcquire::Image(index)) => AcquireStatus::Acquired { index, suboptimal: false },
            Some(MockAcquire::Suboptimal(index)) => AcquireStatus::Acquired { index, suboptimal: true },
            Some(MockAcquire::OutOfDate) => AcquireStatus::OutOfDate,
            Some(MockAcquire::SurfaceLost) => {
                self.state.push("acquire:surface_lost".to_string());
                return Err(Error::SurfaceLost("mock surface lost".to_string()));
            }
            None => {
                let index = self.next_index;
                self.next_index = (self.next_index + 1) % count.max(1);
                AcquireStatus::Acquired { index, suboptimal: false }
            }
        };

        match status {
            AcquireStatus::Acquired { index, .. } if index >= count => {
                Err(Error::InvalidResource(format!("scripted image {} of {}", index, count)))
            }
            AcquireStatus::Acquired { index, suboptimal } => {
                self.state.push(format!("acquire:{}{}", index, if suboptimal { ":suboptimal" } else { "" }));
                Ok(status)
            }
            AcquireStatus::OutOfDate => {
                self.state.push("acquire:out_of_date".to_string());
                Ok(status)
            }
        }
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<()> {
        self.build(extent);
        self.state.push(format!("recreate_swapchain:{}", self.extent));
        Ok(())
    }

    fn prepare_to_present<'a>(&'a self, image_index: u32, wait_semaphore: &'a dyn GpuSemaphore) -> PresentRequest<'a> {
        PresentRequest {
            swapchain: self,
            image_index,
            wait_semaphore,
        }
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<&dyn Image> {
        self.images.get(index).map(|image| image as &dyn Image)
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_UNORM
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        self.state.push(format!("destroy_swapchain:{}", self.id));
    }
}

// ============================================================================
// Mock RenderPass / Framebuffer
// ============================================================================

pub struct MockRenderPass {
    pub id: u64,
    pub desc: RenderPassDesc,
    state: Arc<MockState>,
}

impl RenderPass for MockRenderPass {
    fn attachment_count(&self) -> usize {
        self.desc.attachments.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockRenderPass {
    fn drop(&mut self) {
        self.state.push(format!("destroy_render_pass:{}", self.id));
    }
}

pub struct MockFramebuffer {
    pub id: u64,
    /// Attachment labels in attachment order
    pub label: String,
    extent: Extent2D,
    state: Arc<MockState>,
}

impl Framebuffer for MockFramebuffer {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        self.state.push(format!("destroy_framebuffer:{}", self.id));
    }
}

// ============================================================================
// Mock Fence / Semaphore
// ============================================================================

pub struct MockFence {
    pub id: u64,
    signal: Arc<(Mutex<bool>, Condvar)>,
    state: Arc<MockState>,
}

impl Fence for MockFence {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        let (flag, wake) = &*self.signal;
        let guard = lock(flag);
        let (guard, _) = wake
            .wait_timeout_while(guard, timeout, |signaled| !*signaled)
            .unwrap_or_else(PoisonError::into_inner);
        Ok(*guard)
    }

    fn reset(&self) -> Result<()> {
        *lock(&self.signal.0) = false;
        self.state.push(format!("fence_reset:{}", self.id));
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(*lock(&self.signal.0))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFence {
    fn drop(&mut self) {
        self.state.push(format!("destroy_fence:{}", self.id));
    }
}

pub struct MockSemaphore {
    _id: u64,
}

impl GpuSemaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandPool / CommandBuffer
// ============================================================================

pub struct MockCommandPool {
    id: u64,
    state: Arc<MockState>,
}

impl CommandPool for MockCommandPool {
    fn allocate(&mut self, level: CommandBufferLevel, count: u32) -> Result<Vec<Box<dyn CommandBuffer>>> {
        let mut buffers: Vec<Box<dyn CommandBuffer>> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = self.state.next_id();
            let log = Arc::new(Mutex::new(Vec::new()));
            lock(&self.state.command_logs).insert(id, log.clone());
            buffers.push(Box::new(MockCommandBuffer {
                id,
                level,
                log,
                state: self.state.clone(),
            }));
        }
        Ok(buffers)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockCommandPool {
    fn drop(&mut self) {
        self.state.push(format!("destroy_command_pool:{}", self.id));
    }
}

pub struct MockCommandBuffer {
    pub id: u64,
    pub level: CommandBufferLevel,
    log: Arc<Mutex<Vec<String>>>,
    state: Arc<MockState>,
}

impl MockCommandBuffer {
    fn record(&self, command: String) -> Result<()> {
        lock(&self.log).push(command);
        Ok(())
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        lock(&self.log).clear();
        self.state.push(format!("begin_cmd:{}", self.id));
        self.record("begin".to_string())
    }

    fn begin_secondary(&mut self, inheritance: &InheritanceInfo) -> Result<()> {
        lock(&self.log).clear();
        let label = inheritance
            .framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .map_or("?", |fb| fb.label.as_str());
        self.record(format!("begin_secondary:{}", label))
    }

    fn end(&mut self) -> Result<()> {
        self.record("end".to_string())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        render_area: Rect2D,
        clear_values: &[ClearValue],
        contents: SubpassContents,
    ) -> Result<()> {
        let label = framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .map_or("?", |fb| fb.label.as_str());
        self.record(format!(
            "begin_render_pass:{}:{}x{}:{:?}",
            label, render_area.width, render_area.height, contents
        ))?;
        self.record(format!("clear_values:{:?}", clear_values))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record("end_render_pass".to_string())
    }

    fn execute_secondary(&mut self, buffers: &[&dyn CommandBuffer]) -> Result<()> {
        let ids: Vec<String> = buffers
            .iter()
            .map(|cmd| mock_command_buffer_id(*cmd).to_string())
            .collect();
        self.record(format!("execute_secondary:{}", ids.join(",")))
    }

    fn bind_graphics_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()> {
        self.record(format!("bind_graphics_pipeline:{}", pipeline_name(pipeline)))
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn PipelineObject) -> Result<()> {
        self.record(format!("bind_compute_pipeline:{}", pipeline_name(pipeline)))
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, offset: u64) -> Result<()> {
        self.record(format!("bind_vertex_buffer:{}:{}", buffer_id(buffer), offset))
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        self.record(format!("bind_index_buffer:{}:{}:{:?}", buffer_id(buffer), offset, index_type))
    }

    fn bind_resource_package(
        &mut self,
        pipeline: &dyn PipelineObject,
        set: u32,
        package: &dyn ResourcePackage,
    ) -> Result<()> {
        let id = package
            .as_any()
            .downcast_ref::<MockResourcePackage>()
            .map_or(0, |package| package.id);
        self.record(format!("bind_resource_package:{}:{}:{}", pipeline_name(pipeline), set, id))
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(format!("set_viewport:{}x{}", viewport.width, viewport.height))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.record(format!("set_scissor:{}x{}", scissor.width, scissor.height))
    }

    fn set_line_width(&mut self, width: f32) -> Result<()> {
        self.record(format!("set_line_width:{}", width))
    }

    fn set_depth_bias(&mut self, bias: DepthBias) -> Result<()> {
        self.record(format!(
            "set_depth_bias:{}:{}:{}",
            bias.constant_factor, bias.clamp, bias.slope_factor
        ))
    }

    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()> {
        self.record(format!("set_blend_constants:{:?}", constants))
    }

    fn set_depth_bounds(&mut self, min: f32, max: f32) -> Result<()> {
        self.record(format!("set_depth_bounds:{}:{}", min, max))
    }

    fn push_constants(
        &mut self,
        _pipeline: &dyn PipelineObject,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.record(format!("push_constants:{:?}:{}:{}", stages, offset, data.len()))
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let failures = self.state.draw_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.state.draw_failures.store(failures - 1, Ordering::SeqCst);
            self.state.push(format!("draw_failed:{}", self.id));
            return Err(Error::BackendError("draw recording failed".to_string()));
        }
        self.record(format!("draw:{}:{}", vertex_count, first_vertex))
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.record(format!("draw_indexed:{}:{}:{}", index_count, first_index, vertex_offset))
    }

    fn dispatch(&mut self, group_counts: [u32; 3]) -> Result<()> {
        self.record(format!(
            "dispatch:{}x{}x{}",
            group_counts[0], group_counts[1], group_counts[2]
        ))
    }

    fn image_barrier(&mut self, image: &dyn Image, old_layout: ImageLayout, new_layout: ImageLayout) -> Result<()> {
        self.record(format!("image_barrier:{}:{:?}->{:?}", image_label(image), old_layout, new_layout))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn pipeline_name(pipeline: &dyn PipelineObject) -> &str {
    pipeline
        .as_any()
        .downcast_ref::<MockPipelineObject>()
        .map_or("?", |pipeline| pipeline.name.as_str())
}

fn buffer_id(buffer: &dyn Buffer) -> u64 {
    buffer.as_any().downcast_ref::<MockBuffer>().map_or(0, |buffer| buffer.id)
}

// ============================================================================
// Mock Buffer / Pipeline / Cache / ResourcePackage
// ============================================================================

pub struct MockBuffer {
    pub id: u64,
    data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.data).clone()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        lock(&self.data).len() as u64
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut contents = lock(&self.data);
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} exceeds buffer size {}",
                data.len(),
                offset,
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipelineObject {
    pub name: String,
    bind_point: PipelineBindPoint,
    state: Arc<MockState>,
}

impl PipelineObject for MockPipelineObject {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockPipelineObject {
    fn drop(&mut self) {
        self.state.push(format!("destroy_pipeline:{}", self.name));
    }
}

/// Bytes a fresh mock cache reports
pub const MOCK_CACHE_BLOB: &[u8] = b"mock-pipeline-cache";

pub struct MockPipelineCache {
    data: Vec<u8>,
}

impl PipelineCache for MockPipelineCache {
    fn data(&self) -> Result<Vec<u8>> {
        if self.data.is_empty() {
            Ok(MOCK_CACHE_BLOB.to_vec())
        } else {
            Ok(self.data.clone())
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockResourcePackage {
    pub id: u64,
    set: u32,
}

impl ResourcePackage for MockResourcePackage {
    fn set(&self) -> u32 {
        self.set
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
