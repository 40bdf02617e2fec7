/// Frame synchronization objects of a render target
///
/// - one in-flight fence per frame slot, created signaled so the first wait
///   on each slot returns immediately
/// - one image-available semaphore per frame slot (swapchain targets)
/// - one render-finished semaphore per swapchain image (swapchain targets),
///   so a semaphore is never re-signaled while the presentation engine may
///   still be waiting on it
/// - the images-in-flight table: which slot last submitted work rendering to
///   each swapchain image

use std::time::Duration;

use crate::engine_error;
use crate::error::{Error, Result};
use crate::graphics_device::{Fence, GpuSemaphore, GraphicsDevice};

pub struct FrameSync {
    in_flight: Vec<Box<dyn Fence>>,
    image_available: Vec<Box<dyn GpuSemaphore>>,
    render_finished: Vec<Box<dyn GpuSemaphore>>,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameSync {
    /// Fences only (off-screen targets)
    pub fn for_offscreen(device: &dyn GraphicsDevice, buffer_count: usize) -> Result<Self> {
        Ok(Self {
            in_flight: create_fences(device, buffer_count)?,
            image_available: Vec::new(),
            render_finished: Vec::new(),
            images_in_flight: Vec::new(),
        })
    }

    /// Fences plus presentation semaphores
    ///
    /// # Arguments
    ///
    /// * `device` - Device the objects are created on
    /// * `buffer_count` - Number of frame slots
    /// * `image_count` - Number of swapchain images
    pub fn for_swapchain(device: &dyn GraphicsDevice, buffer_count: usize, image_count: usize) -> Result<Self> {
        let image_available = (0..buffer_count)
            .map(|_| device.create_semaphore())
            .collect::<Result<Vec<_>>>()?;
        let render_finished = (0..image_count)
            .map(|_| device.create_semaphore())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            in_flight: create_fences(device, buffer_count)?,
            image_available,
            render_finished,
            images_in_flight: vec![None; image_count],
        })
    }

    pub fn slot_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn image_count(&self) -> usize {
        self.render_finished.len()
    }

    pub fn in_flight(&self, slot: usize) -> Result<&dyn Fence> {
        self.in_flight
            .get(slot)
            .map(|fence| fence.as_ref())
            .ok_or_else(|| out_of_range("in-flight fence", slot))
    }

    pub fn image_available(&self, slot: usize) -> Result<&dyn GpuSemaphore> {
        self.image_available
            .get(slot)
            .map(|semaphore| semaphore.as_ref())
            .ok_or_else(|| out_of_range("image-available semaphore", slot))
    }

    pub fn render_finished(&self, image: usize) -> Result<&dyn GpuSemaphore> {
        self.render_finished
            .get(image)
            .map(|semaphore| semaphore.as_ref())
            .ok_or_else(|| out_of_range("render-finished semaphore", image))
    }

    /// Slot whose submission last rendered to a swapchain image
    pub fn image_owner(&self, image: usize) -> Option<usize> {
        self.images_in_flight.get(image).copied().flatten()
    }

    /// Wait for a slot's fence
    ///
    /// # Errors
    ///
    /// `Error::DeviceLost` if the fence is not signaled within `timeout`.
    pub fn wait_slot(&self, slot: usize, timeout: Duration) -> Result<()> {
        if self.in_flight(slot)?.wait(timeout)? {
            return Ok(());
        }

        engine_error!("flint3d::FrameSync", "Fence of frame slot {} not signaled after {:?}", slot, timeout);
        Err(Error::DeviceLost(format!(
            "Fence of frame slot {} timed out after {:?}",
            slot, timeout
        )))
    }

    /// Wait for every slot's fence
    pub fn wait_all(&self, timeout: Duration) -> Result<()> {
        (0..self.in_flight.len()).try_for_each(|slot| self.wait_slot(slot, timeout))
    }

    /// Make `slot` the owner of a swapchain image
    ///
    /// If another slot's submission still renders to that image, waits for
    /// that slot's fence first.
    pub fn claim_image(&mut self, image: usize, slot: usize, timeout: Duration) -> Result<()> {
        let owner = match self.images_in_flight.get(image) {
            Some(owner) => *owner,
            None => return Err(out_of_range("swapchain image", image)),
        };

        if let Some(previous) = owner {
            if previous != slot {
                self.wait_slot(previous, timeout)?;
            }
        }

        self.images_in_flight[image] = Some(slot);
        Ok(())
    }
}

fn create_fences(device: &dyn GraphicsDevice, count: usize) -> Result<Vec<Box<dyn Fence>>> {
    (0..count).map(|_| device.create_fence(true)).collect()
}

fn out_of_range(what: &str, index: usize) -> Error {
    Error::InvalidResource(format!("No {} at index {}", what, index))
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
