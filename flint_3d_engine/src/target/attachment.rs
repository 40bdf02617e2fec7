/// Render target attachment - one image resource of a render target
///
/// Color and depth attachments own one image per frame slot. Swapchain
/// attachments own nothing: their images belong to the swapchain, the
/// attachment only describes how the render pass treats them.
///
/// Recreation builds the complete replacement set first and swaps it in only
/// on success, so an attachment is never left half destroyed.

use crate::error::{Error, Result};
use crate::graphics_device::{
    AttachmentDescription, CommandBuffer, Extent2D, GraphicsDevice, Image, ImageDesc, ImageLayout,
    ImageUsage, LoadOp, SampleCount, StoreOp, TextureFormat,
};

/// What an attachment is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Color output (multisampled color buffer, or an off-screen color target)
    Color,
    /// Depth/stencil buffer
    Depth,
    /// Swapchain image; `resolve` when it receives the resolved multisampled color
    Swapchain { resolve: bool },
}

pub struct RenderTargetAttachment {
    kind: AttachmentKind,
    format: TextureFormat,
    samples: SampleCount,
    usage: ImageUsage,
    extent: Extent2D,
    image_count: usize,
    /// `None` after a failed recreation (swapchain attachments never own images)
    images: Option<Vec<Box<dyn Image>>>,
    layouts: Vec<ImageLayout>,
}

impl RenderTargetAttachment {
    /// Create an attachment and allocate its images
    ///
    /// # Arguments
    ///
    /// * `device` - Device the images are allocated on
    /// * `kind` - Color, depth or swapchain
    /// * `extent` - Image size
    /// * `buffer_count` - Number of images (one per frame slot)
    /// * `format` - Pixel format
    /// * `samples` - Sample count (forced to 1 for swapchain attachments)
    /// * `usage` - Extra usage on top of the kind's attachment usage (e.g. `SAMPLED`)
    ///
    /// # Errors
    ///
    /// The device error if an image cannot be allocated, typically
    /// `Error::ResourceCreationFailed` for unsupported format/sample-count
    /// combinations.
    pub fn create(
        device: &dyn GraphicsDevice,
        kind: AttachmentKind,
        extent: Extent2D,
        buffer_count: usize,
        format: TextureFormat,
        samples: SampleCount,
        usage: ImageUsage,
    ) -> Result<Self> {
        let samples = match kind {
            AttachmentKind::Swapchain { .. } => SampleCount::S1,
            _ => samples,
        };

        let mut attachment = Self {
            kind,
            format,
            samples,
            usage,
            extent,
            image_count: buffer_count,
            images: None,
            layouts: Vec::new(),
        };

        if attachment.owns_images() {
            let (images, layouts) = attachment.build(device, extent)?;
            attachment.images = Some(images);
            attachment.layouts = layouts;
        }
        Ok(attachment)
    }

    /// Reallocate the images at a new extent
    ///
    /// On failure the previous images are released and the attachment stays
    /// invalid until a later `recreate` succeeds.
    pub fn recreate(&mut self, device: &dyn GraphicsDevice, extent: Extent2D) -> Result<()> {
        if !self.owns_images() {
            self.extent = extent;
            return Ok(());
        }

        match self.build(device, extent) {
            Ok((images, layouts)) => {
                self.images = Some(images);
                self.layouts = layouts;
                self.extent = extent;
                Ok(())
            }
            Err(e) => {
                self.images = None;
                self.layouts.clear();
                Err(e)
            }
        }
    }

    fn build(&self, device: &dyn GraphicsDevice, extent: Extent2D) -> Result<(Vec<Box<dyn Image>>, Vec<ImageLayout>)> {
        let desc = ImageDesc {
            extent,
            format: self.format,
            samples: self.samples,
            usage: self.image_usage(),
        };

        let images = (0..self.image_count)
            .map(|_| device.create_attachment_image(&desc))
            .collect::<Result<Vec<_>>>()?;

        let layout = self.attachment_layout();
        let refs: Vec<&dyn Image> = images.iter().map(|image| image.as_ref()).collect();
        device.transition_image_layouts(&refs, ImageLayout::Undefined, layout)?;

        let layouts = vec![layout; images.len()];
        Ok((images, layouts))
    }

    fn owns_images(&self) -> bool {
        !matches!(self.kind, AttachmentKind::Swapchain { .. })
    }

    fn image_usage(&self) -> ImageUsage {
        match self.kind {
            AttachmentKind::Color => {
                let mut usage = ImageUsage::COLOR_ATTACHMENT | self.usage;
                // Multisampled color is resolved in-pass and never read back
                if self.samples.is_multisampled() && !self.is_sampled() {
                    usage |= ImageUsage::TRANSIENT;
                }
                usage
            }
            AttachmentKind::Depth => ImageUsage::DEPTH_STENCIL_ATTACHMENT | self.usage,
            AttachmentKind::Swapchain { .. } => ImageUsage::COLOR_ATTACHMENT,
        }
    }

    fn is_sampled(&self) -> bool {
        self.usage.contains(ImageUsage::SAMPLED)
    }

    /// Static description used to build the render pass
    pub fn attachment_description(&self) -> AttachmentDescription {
        match self.kind {
            AttachmentKind::Color => AttachmentDescription {
                format: self.format,
                samples: self.samples,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                stencil_load_op: LoadOp::DontCare,
                stencil_store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::Undefined,
                final_layout: if self.is_sampled() {
                    ImageLayout::ShaderReadOnlyOptimal
                } else {
                    ImageLayout::ColorAttachmentOptimal
                },
            },
            AttachmentKind::Depth => AttachmentDescription {
                format: self.format,
                samples: self.samples,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                stencil_load_op: LoadOp::Clear,
                stencil_store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::Undefined,
                final_layout: if self.is_sampled() {
                    ImageLayout::ShaderReadOnlyOptimal
                } else {
                    ImageLayout::DepthStencilAttachmentOptimal
                },
            },
            AttachmentKind::Swapchain { resolve } => AttachmentDescription {
                format: self.format,
                samples: SampleCount::S1,
                load_op: if resolve { LoadOp::DontCare } else { LoadOp::Clear },
                store_op: StoreOp::Store,
                stencil_load_op: LoadOp::DontCare,
                stencil_store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            },
        }
    }

    /// Layout the attachment is in during the render pass
    pub fn attachment_layout(&self) -> ImageLayout {
        match self.kind {
            AttachmentKind::Color | AttachmentKind::Swapchain { .. } => ImageLayout::ColorAttachmentOptimal,
            AttachmentKind::Depth => ImageLayout::DepthStencilAttachmentOptimal,
        }
    }

    /// Record a layout transition if the image is not already in `new_layout`
    pub fn transition(&mut self, cmd: &mut dyn CommandBuffer, index: usize, new_layout: ImageLayout) -> Result<()> {
        let current = self.current_layout(index).ok_or_else(|| self.no_image(index))?;
        if current == new_layout {
            return Ok(());
        }

        let image = self.image(index).ok_or_else(|| self.no_image(index))?;
        cmd.image_barrier(image, current, new_layout)?;
        self.layouts[index] = new_layout;
        Ok(())
    }

    /// Record the layout a render pass left an image in
    pub fn mark_layout(&mut self, index: usize, layout: ImageLayout) {
        if let Some(current) = self.layouts.get_mut(index) {
            *current = layout;
        }
    }

    /// Tracked layout of an owned image
    pub fn current_layout(&self, index: usize) -> Option<ImageLayout> {
        self.layouts.get(index).copied()
    }

    fn no_image(&self, index: usize) -> Error {
        Error::InvalidResource(format!("{:?} attachment has no image {}", self.kind, index))
    }

    /// Owned image by frame slot
    pub fn image(&self, index: usize) -> Option<&dyn Image> {
        self.images
            .as_ref()
            .and_then(|images| images.get(index))
            .map(|image| image.as_ref())
    }

    /// Whether the attachment holds usable images
    pub fn is_valid(&self) -> bool {
        !self.owns_images() || self.images.is_some()
    }

    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn samples(&self) -> SampleCount {
        self.samples
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Number of owned images (0 for swapchain attachments)
    pub fn image_count(&self) -> usize {
        self.images.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
