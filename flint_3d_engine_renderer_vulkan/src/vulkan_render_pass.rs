/// RenderPass - Vulkan implementation of the RenderPass trait

use flint_3d_engine::flint3d::Result;
use flint_3d_engine::flint3d::render::{AttachmentReference, RenderPass, RenderPassDesc};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::{vk_creation_error, GpuContext};
use crate::vulkan_format::{
    access_flags_to_vk, format_to_vk, image_layout_to_vk, load_op_to_vk, pipeline_stages_to_vk,
    sample_count_to_vk, store_op_to_vk, subpass_ref_to_vk,
};

/// Vulkan render pass
pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    attachment_count: usize,
}

/// Attachment references of one subpass, kept alive while the create info points at them
struct SubpassReferences {
    color: Vec<vk::AttachmentReference>,
    resolve: Vec<vk::AttachmentReference>,
    depth: Option<vk::AttachmentReference>,
}

fn reference_to_vk(reference: &AttachmentReference) -> vk::AttachmentReference {
    vk::AttachmentReference::default()
        .attachment(reference.attachment)
        .layout(image_layout_to_vk(reference.layout))
}

impl VulkanRenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let attachments: Vec<vk::AttachmentDescription> = desc.attachments
            .iter()
            .map(|attachment| {
                vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(sample_count_to_vk(attachment.samples))
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                    .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                    .initial_layout(image_layout_to_vk(attachment.initial_layout))
                    .final_layout(image_layout_to_vk(attachment.final_layout))
            })
            .collect();

        let references: Vec<SubpassReferences> = desc.subpasses
            .iter()
            .map(|subpass| SubpassReferences {
                color: subpass.color_attachments.iter().map(reference_to_vk).collect(),
                resolve: subpass.resolve_attachments.iter().map(reference_to_vk).collect(),
                depth: subpass.depth_stencil_attachment.as_ref().map(reference_to_vk),
            })
            .collect();

        let subpasses: Vec<vk::SubpassDescription> = references
            .iter()
            .map(|refs| {
                let mut subpass = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(&refs.color);
                if !refs.resolve.is_empty() {
                    subpass = subpass.resolve_attachments(&refs.resolve);
                }
                if let Some(depth) = &refs.depth {
                    subpass = subpass.depth_stencil_attachment(depth);
                }
                subpass
            })
            .collect();

        let dependencies: Vec<vk::SubpassDependency> = desc.dependencies
            .iter()
            .map(|dependency| {
                let flags = if dependency.by_region {
                    vk::DependencyFlags::BY_REGION
                } else {
                    vk::DependencyFlags::empty()
                };
                vk::SubpassDependency::default()
                    .src_subpass(subpass_ref_to_vk(dependency.src_subpass))
                    .dst_subpass(subpass_ref_to_vk(dependency.dst_subpass))
                    .src_stage_mask(pipeline_stages_to_vk(dependency.src_stage_mask))
                    .dst_stage_mask(pipeline_stages_to_vk(dependency.dst_stage_mask))
                    .src_access_mask(access_flags_to_vk(dependency.src_access_mask))
                    .dst_access_mask(access_flags_to_vk(dependency.dst_access_mask))
                    .dependency_flags(flags)
            })
            .collect();

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { ctx.device.create_render_pass(&render_pass_info, None) }
            .map_err(|e| vk_creation_error("Failed to create render pass", e))?;

        Ok(Self {
            ctx,
            render_pass,
            attachment_count: attachments.len(),
        })
    }
}

impl RenderPass for VulkanRenderPass {
    fn attachment_count(&self) -> usize {
        self.attachment_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
