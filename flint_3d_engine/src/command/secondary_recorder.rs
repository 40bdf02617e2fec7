/// Parallel secondary command buffer recording
///
/// A persistent pool of worker threads. Each worker owns a start signal
/// (`BinarySemaphore`), a job slot, its own command pool and one secondary
/// command buffer per frame slot. All workers report completion on one
/// shared `CountingSemaphore`.
///
/// `record()` splits the draw items into contiguous chunks (one per active
/// worker, draw order preserved), starts the workers and waits until exactly
/// that many completions have been reported. The recorded buffers are then
/// handed back in draw order for `execute_secondary()`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::command::{record_draw_item, DrawBatch, DrawItem};
use crate::engine_warn;
use crate::error::{Error, Result};
use crate::graphics_device::{
    CommandBuffer, CommandBufferLevel, CommandPool, Extent2D, GraphicsDevice, InheritanceInfo,
    QueueKind,
};
use crate::sync::{BinarySemaphore, CountingSemaphore};
use crate::target::RenderTargetId;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work for one worker, one frame
struct RecordJob {
    slot: usize,
    inheritance: InheritanceInfo,
    items: Vec<DrawItem>,
    target: RenderTargetId,
    extent: Extent2D,
}

/// State shared between a worker thread and the recorder
struct WorkerShared {
    start: BinarySemaphore,
    job: Mutex<Option<RecordJob>>,
    buffers: Mutex<Vec<Box<dyn CommandBuffer>>>,
    result: Mutex<Option<Result<()>>>,
}

struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
    // Dropped after `shared` releases the buffers allocated from it
    _pool: Box<dyn CommandPool>,
}

/// Recorded secondaries of one frame, in draw order
///
/// Holds the workers' buffer locks; drop it before the next `record()`.
pub struct RecordedSecondaries<'a> {
    guards: Vec<MutexGuard<'a, Vec<Box<dyn CommandBuffer>>>>,
    slot: usize,
}

impl RecordedSecondaries<'_> {
    /// Buffers to pass to `execute_secondary`
    pub fn buffers(&self) -> Vec<&dyn CommandBuffer> {
        self.guards
            .iter()
            .filter_map(|buffers| buffers.get(self.slot))
            .map(|cmd| cmd.as_ref() as &dyn CommandBuffer)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

pub struct SecondaryRecorder {
    workers: Vec<Worker>,
    completed: Arc<CountingSemaphore>,
    should_run: Arc<AtomicBool>,
    buffer_count: usize,
}

impl SecondaryRecorder {
    /// Spawn `worker_count` recording threads
    ///
    /// # Arguments
    ///
    /// * `device` - Device the workers' command pools are created on
    /// * `worker_count` - Number of threads (named `flint3d-recorder-<i>`)
    /// * `buffer_count` - Number of frame slots (one secondary per slot per worker)
    pub fn new(device: &dyn GraphicsDevice, worker_count: usize, buffer_count: usize) -> Result<Self> {
        let mut recorder = Self {
            workers: Vec::with_capacity(worker_count),
            completed: Arc::new(CountingSemaphore::new()),
            should_run: Arc::new(AtomicBool::new(true)),
            buffer_count,
        };

        // On error the partially built recorder is dropped, which joins the
        // workers spawned so far
        for index in 0..worker_count {
            let mut pool = device.create_command_pool(QueueKind::Graphics)?;
            let buffers = pool.allocate(CommandBufferLevel::Secondary, buffer_count as u32)?;
            let shared = Arc::new(WorkerShared {
                start: BinarySemaphore::new(),
                job: Mutex::new(None),
                buffers: Mutex::new(buffers),
                result: Mutex::new(None),
            });

            let handle = {
                let shared = shared.clone();
                let completed = recorder.completed.clone();
                let should_run = recorder.should_run.clone();
                thread::Builder::new()
                    .name(format!("flint3d-recorder-{}", index))
                    .spawn(move || worker_loop(&shared, &completed, &should_run))
                    .map_err(|e| {
                        Error::InitializationFailed(format!("Failed to spawn recorder thread {}: {}", index, e))
                    })?
            };

            recorder.workers.push(Worker {
                shared,
                handle: Some(handle),
                _pool: pool,
            });
        }

        Ok(recorder)
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Record the batches into the workers' secondaries for a frame slot
    ///
    /// Blocks until every active worker has finished.
    ///
    /// # Arguments
    ///
    /// * `slot` - Frame slot (selects which secondary each worker records)
    /// * `inheritance` - Render pass / framebuffer / subpass of the primary
    /// * `batches` - Draw batches, recorded in order
    /// * `target` - Render target the primary belongs to
    /// * `extent` - Render area for default viewport/scissor
    ///
    /// # Errors
    ///
    /// The first recording error of any worker, in draw order.
    pub fn record(
        &mut self,
        slot: usize,
        inheritance: &InheritanceInfo,
        batches: &[DrawBatch],
        target: RenderTargetId,
        extent: Extent2D,
    ) -> Result<RecordedSecondaries<'_>> {
        if slot >= self.buffer_count {
            return Err(Error::InvalidResource(format!(
                "Frame slot {} out of range ({} slots)",
                slot, self.buffer_count
            )));
        }

        let items: Vec<&DrawItem> = batches.iter().flat_map(|batch| batch.items.iter()).collect();
        debug_assert!(
            items.iter().all(|item| item.pipeline.target_id() == target),
            "draw item pipeline was built for another render target"
        );

        if items.is_empty() || self.workers.is_empty() {
            return Ok(RecordedSecondaries { guards: Vec::new(), slot });
        }

        let chunk_size = items.len().div_ceil(self.workers.len());
        let chunks: Vec<&[&DrawItem]> = items.chunks(chunk_size).collect();
        let active = chunks.len();

        for (worker, chunk) in self.workers.iter().zip(&chunks) {
            *lock(&worker.shared.result) = None;
            *lock(&worker.shared.job) = Some(RecordJob {
                slot,
                inheritance: inheritance.clone(),
                items: chunk.iter().map(|item| (*item).clone()).collect(),
                target,
                extent,
            });
            worker.shared.start.release();
        }

        self.completed.acquire(active as u32);

        for worker in &self.workers[..active] {
            match lock(&worker.shared.result).take() {
                Some(Ok(())) => {}
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(Error::BackendError("Recorder worker reported no result".to_string()));
                }
            }
        }

        let guards = self.workers[..active]
            .iter()
            .map(|worker| lock(&worker.shared.buffers))
            .collect();
        Ok(RecordedSecondaries { guards, slot })
    }

    /// Stop and join every worker (idempotent)
    pub fn shutdown(&mut self) {
        self.should_run.store(false, Ordering::Release);
        for worker in &self.workers {
            worker.shared.start.release();
        }
        for (index, worker) in self.workers.iter_mut().enumerate() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    engine_warn!("flint3d::SecondaryRecorder", "Recorder thread {} panicked", index);
                }
            }
        }
        self.workers.clear();
    }
}

impl Drop for SecondaryRecorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &WorkerShared, completed: &CountingSemaphore, should_run: &AtomicBool) {
    loop {
        shared.start.acquire();
        if !should_run.load(Ordering::Acquire) {
            break;
        }

        if let Some(job) = lock(&shared.job).take() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut buffers = lock(&shared.buffers);
                match buffers.get_mut(job.slot) {
                    Some(cmd) => record_job(cmd.as_mut(), &job),
                    None => Err(Error::InvalidResource(format!("No secondary buffer for slot {}", job.slot))),
                }
            }))
            .unwrap_or_else(|_| Err(Error::BackendError("Recorder worker panicked while recording".to_string())));

            // Release the job's references before reporting completion
            drop(job);
            *lock(&shared.result) = Some(result);
        }

        completed.release();
    }
}

fn record_job(cmd: &mut dyn CommandBuffer, job: &RecordJob) -> Result<()> {
    cmd.begin_secondary(&job.inheritance)?;
    for item in &job.items {
        record_draw_item(cmd, item, job.target, job.extent)?;
    }
    cmd.end()
}

#[cfg(test)]
#[path = "secondary_recorder_tests.rs"]
mod tests;
