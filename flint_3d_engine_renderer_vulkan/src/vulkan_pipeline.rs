/// Pipeline - Vulkan implementations of PipelineObject, PipelineCache and ResourcePackage
///
/// Graphics pipelines are compiled against a concrete render pass; compute
/// pipelines only need their layout. Descriptor set layouts come from the
/// declared resource layouts (index = set number).

use flint_3d_engine::flint3d::{Error, Result};
use flint_3d_engine::flint3d::render::{
    BoundResource, ComputePipelineCreateInfo, GraphicsPipelineCreateInfo,
    PipelineBindPoint, PipelineCache, PipelineObject, PushConstantRange, ResourceBinding,
    ResourceKind, ResourceLayout, ResourcePackage,
};
use flint_3d_engine::{engine_debug, engine_error, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::{downcast, vk_creation_error, vk_error, GpuContext};
use crate::vulkan_format::{
    compare_op_to_vk, cull_mode_to_vk, dynamic_states_to_vk, extent_to_vk, front_face_to_vk,
    input_rate_to_vk, polygon_mode_to_vk, resource_kind_to_vk, sample_count_to_vk,
    shader_stages_to_vk, topology_to_vk, vertex_format_to_vk,
};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_render_pass::VulkanRenderPass;

const SOURCE: &str = "flint3d::vulkan";

/// Every shader module is entered at `main`
const ENTRY_POINT: &std::ffi::CStr = c"main";

// ===== SHADER MODULES =====

/// Shader module alive only for the duration of pipeline creation
struct ShaderModule<'a> {
    device: &'a ash::Device,
    module: vk::ShaderModule,
}

impl<'a> ShaderModule<'a> {
    fn new(device: &'a ash::Device, code: &[u32], stage: &str) -> Result<Self> {
        if code.is_empty() {
            engine_error!(SOURCE, "Empty SPIR-V code for {} shader", stage);
            return Err(Error::InvalidResource(format!("Empty SPIR-V code for {} shader", stage)));
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| vk_creation_error(&format!("Failed to create {} shader module", stage), e))?;

        Ok(Self { device, module })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

// ===== PIPELINE LAYOUT =====

/// Descriptor set layouts and the pipeline layout built from them
struct LayoutObjects {
    set_layouts: Vec<vk::DescriptorSetLayout>,
    layout: vk::PipelineLayout,
}

impl LayoutObjects {
    fn new(
        device: &ash::Device,
        resource_layouts: &[ResourceLayout],
        push_constants: Option<&PushConstantRange>,
    ) -> Result<Self> {
        let mut objects = Self {
            set_layouts: Vec::with_capacity(resource_layouts.len()),
            layout: vk::PipelineLayout::null(),
        };

        for resource_layout in resource_layouts {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = resource_layout.bindings
                .iter()
                .map(|entry| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(entry.binding)
                        .descriptor_type(resource_kind_to_vk(entry.kind))
                        .descriptor_count(1)
                        .stage_flags(shader_stages_to_vk(entry.stages))
                })
                .collect();

            let layout_create = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

            match unsafe { device.create_descriptor_set_layout(&layout_create, None) } {
                Ok(set_layout) => objects.set_layouts.push(set_layout),
                Err(e) => {
                    objects.destroy(device);
                    return Err(vk_creation_error("Failed to create descriptor set layout", e));
                }
            }
        }

        let push_constant_ranges: Vec<vk::PushConstantRange> = push_constants
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&objects.set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        match unsafe { device.create_pipeline_layout(&layout_create_info, None) } {
            Ok(layout) => objects.layout = layout,
            Err(e) => {
                objects.destroy(device);
                return Err(vk_creation_error("Failed to create pipeline layout", e));
            }
        }

        Ok(objects)
    }

    fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            if self.layout != vk::PipelineLayout::null() {
                device.destroy_pipeline_layout(self.layout, None);
                self.layout = vk::PipelineLayout::null();
            }
            for set_layout in self.set_layouts.drain(..) {
                device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

fn cache_handle(cache: Option<&dyn PipelineCache>) -> Result<vk::PipelineCache> {
    match cache {
        Some(cache) => Ok(downcast::<VulkanPipelineCache>(cache.as_any(), "Pipeline cache")?.cache),
        None => Ok(vk::PipelineCache::null()),
    }
}

// ===== PIPELINE =====

/// Vulkan pipeline implementation (graphics or compute)
pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (for descriptor set binding and push constants)
    pub(crate) layout: vk::PipelineLayout,
    /// Descriptor set layouts, index = set number
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Declared resource layouts, kept to validate resource packages
    pub(crate) resource_layouts: Vec<ResourceLayout>,
    bind_point: PipelineBindPoint,
}

impl VulkanPipeline {
    pub(crate) fn new_graphics(ctx: Arc<GpuContext>, info: &GraphicsPipelineCreateInfo) -> Result<Self> {
        let desc = info.desc;
        let device = &ctx.device;
        let render_pass = downcast::<VulkanRenderPass>(info.render_pass.as_any(), "Render pass")?;
        let pipeline_cache = cache_handle(info.cache)?;

        // Shader stages
        let vertex_module = ShaderModule::new(device, &desc.vertex_shader, "vertex")?;
        let fragment_module = match &desc.fragment_shader {
            Some(code) => Some(ShaderModule::new(device, code, "fragment")?),
            None => None,
        };

        let mut shader_stages = vec![
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module.module)
                .name(ENTRY_POINT),
        ];
        if let Some(fragment_module) = &fragment_module {
            shader_stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_module.module)
                    .name(ENTRY_POINT),
            );
        }

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        // Input assembly state
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport state: baked from the target extent, ignored when dynamic
        let extent = extent_to_vk(info.extent);
        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        // Rasterization state
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(desc.rasterization.polygon_mode))
            .line_width(desc.rasterization.line_width)
            .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
            .front_face(front_face_to_vk(desc.rasterization.front_face))
            .depth_bias_enable(desc.rasterization.depth_bias_enable);

        // Depth/stencil state
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test_enable)
            .depth_write_enable(desc.depth.write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
            .depth_bounds_test_enable(desc.depth.bounds_test_enable)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(false);

        // Multisample state
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(info.samples));

        // Color blend state, one entry per color attachment
        let color_blend_attachment = if desc.blend_enable {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                .alpha_blend_op(vk::BlendOp::ADD)
        } else {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false)
        };
        let color_blend_attachments = vec![color_blend_attachment; info.color_attachment_count as usize];

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        // Dynamic state
        let dynamic_states = dynamic_states_to_vk(desc.dynamic_states);
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let mut layout_objects = LayoutObjects::new(device, &desc.resource_layouts, desc.push_constants.as_ref())?;

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout_objects.layout)
            .render_pass(render_pass.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(pipeline_cache, &[pipeline_create_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                layout_objects.destroy(device);
                return Err(vk_creation_error(&format!("Failed to create graphics pipeline '{}'", info.name), e));
            }
        };

        let dynamic_names: Vec<_> = desc.dynamic_states.iter_names().map(|(name, _)| name).collect();
        engine_debug!(SOURCE, "Graphics pipeline '{}' created ({} samples, {} color attachments, dynamic: {:?})",
            info.name, info.samples.count(), info.color_attachment_count, dynamic_names);

        drop(vertex_module);
        drop(fragment_module);

        Ok(Self {
            pipeline,
            layout: layout_objects.layout,
            set_layouts: std::mem::take(&mut layout_objects.set_layouts),
            resource_layouts: desc.resource_layouts.clone(),
            bind_point: PipelineBindPoint::Graphics,
            ctx,
        })
    }

    pub(crate) fn new_compute(ctx: Arc<GpuContext>, info: &ComputePipelineCreateInfo) -> Result<Self> {
        let desc = info.desc;
        let device = &ctx.device;
        let pipeline_cache = cache_handle(info.cache)?;

        let module = ShaderModule::new(device, &desc.shader, "compute")?;
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(module.module)
            .name(ENTRY_POINT);

        let mut layout_objects = LayoutObjects::new(device, &desc.resource_layouts, desc.push_constants.as_ref())?;

        let pipeline_create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout_objects.layout);

        let pipelines = unsafe {
            device.create_compute_pipelines(pipeline_cache, &[pipeline_create_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                layout_objects.destroy(device);
                return Err(vk_creation_error(&format!("Failed to create compute pipeline '{}'", info.name), e));
            }
        };

        engine_debug!(SOURCE, "Compute pipeline '{}' created", info.name);

        drop(module);

        Ok(Self {
            pipeline,
            layout: layout_objects.layout,
            set_layouts: std::mem::take(&mut layout_objects.set_layouts),
            resource_layouts: desc.resource_layouts.clone(),
            bind_point: PipelineBindPoint::Compute,
            ctx,
        })
    }
}

impl PipelineObject for VulkanPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
            for set_layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

// ===== PIPELINE CACHE =====

/// Vulkan pipeline cache
pub struct VulkanPipelineCache {
    ctx: Arc<GpuContext>,
    pub(crate) cache: vk::PipelineCache,
}

impl VulkanPipelineCache {
    /// Create a cache seeded with `initial_data`, falling back to an empty
    /// cache when the driver rejects the data
    pub(crate) fn new(ctx: Arc<GpuContext>, initial_data: &[u8]) -> Result<Self> {
        let create_info = vk::PipelineCacheCreateInfo::default().initial_data(initial_data);

        let cache = match unsafe { ctx.device.create_pipeline_cache(&create_info, None) } {
            Ok(cache) => cache,
            Err(e) if !initial_data.is_empty() => {
                engine_warn!(SOURCE, "Pipeline cache data rejected ({:?}), starting with an empty cache", e);
                unsafe { ctx.device.create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None) }
                    .map_err(|e| vk_creation_error("Failed to create pipeline cache", e))?
            }
            Err(e) => return Err(vk_creation_error("Failed to create pipeline cache", e)),
        };

        Ok(Self { ctx, cache })
    }
}

impl PipelineCache for VulkanPipelineCache {
    fn data(&self) -> Result<Vec<u8>> {
        unsafe { self.ctx.device.get_pipeline_cache_data(self.cache) }
            .map_err(|e| vk_error("Failed to read pipeline cache data", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipelineCache {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_cache(self.cache, None);
        }
    }
}

// ===== RESOURCE PACKAGE =====

/// Vulkan resource package: one descriptor set with its own pool
///
/// Sampled images use a linear clamp-to-edge sampler owned by the package.
pub struct VulkanResourcePackage {
    ctx: Arc<GpuContext>,
    descriptor_pool: vk::DescriptorPool,
    pub(crate) descriptor_set: vk::DescriptorSet,
    sampler: Option<vk::Sampler>,
    set: u32,
}

fn invalid_binding(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::InvalidResource(message)
}

fn create_linear_sampler(device: &ash::Device) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .unnormalized_coordinates(false);

    unsafe { device.create_sampler(&create_info, None) }
        .map_err(|e| vk_creation_error("Failed to create sampler", e))
}

impl VulkanResourcePackage {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: &VulkanPipeline,
        set: u32,
        bindings: &[ResourceBinding],
    ) -> Result<Self> {
        let (resource_layout, set_layout) = match (
            pipeline.resource_layouts.get(set as usize),
            pipeline.set_layouts.get(set as usize),
        ) {
            (Some(resource_layout), Some(set_layout)) => (resource_layout, *set_layout),
            _ => {
                return Err(invalid_binding(format!(
                    "Pipeline layout has {} resource sets, cannot build set {}",
                    pipeline.set_layouts.len(),
                    set
                )));
            }
        };

        // Validate every binding against the declared layout
        let mut kinds = Vec::with_capacity(bindings.len());
        for entry in bindings {
            let declared = resource_layout.bindings
                .iter()
                .find(|declared| declared.binding == entry.binding)
                .ok_or_else(|| invalid_binding(format!(
                    "Binding {} is not declared in resource set {}",
                    entry.binding, set
                )))?;

            let matches = matches!(
                (declared.kind, &entry.resource),
                (ResourceKind::UniformBuffer | ResourceKind::StorageBuffer, BoundResource::Buffer(_))
                    | (ResourceKind::SampledImage, BoundResource::Image(_))
            );
            if !matches {
                return Err(invalid_binding(format!(
                    "Binding {} of set {} expects a {:?}",
                    entry.binding, set, declared.kind
                )));
            }
            kinds.push(declared.kind);
        }

        let device = &ctx.device;

        // Pool sized for exactly this set
        let mut pool_sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
        for kind in &kinds {
            let ty = resource_kind_to_vk(*kind);
            match pool_sizes.iter_mut().find(|size| size.ty == ty) {
                Some(size) => size.descriptor_count += 1,
                None => pool_sizes.push(vk::DescriptorPoolSize { ty, descriptor_count: 1 }),
            }
        }
        if pool_sizes.is_empty() {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            });
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(1)
            .pool_sizes(&pool_sizes);

        let descriptor_pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .map_err(|e| vk_creation_error("Failed to create descriptor pool", e))?;

        let mut package = Self {
            descriptor_pool,
            descriptor_set: vk::DescriptorSet::null(),
            sampler: None,
            set,
            ctx: Arc::clone(&ctx),
        };

        let layouts = [set_layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool)
            .set_layouts(&layouts);

        package.descriptor_set = unsafe { device.allocate_descriptor_sets(&allocate_info) }
            .map_err(|e| vk_creation_error("Failed to allocate descriptor set", e))?[0];

        if kinds.contains(&ResourceKind::SampledImage) {
            package.sampler = Some(create_linear_sampler(device)?);
        }

        // Descriptor infos must stay alive for the duration of the write
        let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::new();
        let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::new();

        for entry in bindings {
            match &entry.resource {
                BoundResource::Buffer(buffer) => {
                    let buffer = downcast::<VulkanBuffer>(buffer.as_any(), "Buffer")?;
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer.buffer)
                            .offset(0)
                            .range(vk::WHOLE_SIZE)
                    );
                }
                BoundResource::Image(image) => {
                    let image = downcast::<VulkanImage>(image.as_any(), "Image")?;
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                            .image_view(image.view)
                            .sampler(package.sampler.unwrap_or_default())
                    );
                }
            }
        }

        // Build write descriptor sets with correct pointers
        let mut buffer_idx = 0usize;
        let mut image_idx = 0usize;
        let mut writes: Vec<vk::WriteDescriptorSet> = Vec::with_capacity(bindings.len());

        for (entry, kind) in bindings.iter().zip(&kinds) {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(package.descriptor_set)
                .dst_binding(entry.binding)
                .dst_array_element(0)
                .descriptor_type(resource_kind_to_vk(*kind));

            let write = match entry.resource {
                BoundResource::Buffer(_) => {
                    buffer_idx += 1;
                    write.buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx - 1]))
                }
                BoundResource::Image(_) => {
                    image_idx += 1;
                    write.image_info(std::slice::from_ref(&image_infos[image_idx - 1]))
                }
            };
            writes.push(write);
        }

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }

        Ok(package)
    }
}

impl ResourcePackage for VulkanResourcePackage {
    fn set(&self) -> u32 {
        self.set
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanResourcePackage {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its descriptor set
            self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            if let Some(sampler) = self.sampler.take() {
                self.ctx.device.destroy_sampler(sampler, None);
            }
        }
    }
}

