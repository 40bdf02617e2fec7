/// Conversions between engine value types and Vulkan enums and flags
///
/// Everything here is pure so the mappings can be tested without a GPU.

use ash::vk;
use flint_3d_engine::flint3d::render::{
    AccessFlags, ClearValue, ColorSpace, CompareOp, CompositeAlphaFlags, CullMode, DynamicStateFlags,
    Extent2D, FrontFace, ImageLayout, ImageUsage, IndexType, LoadOp, PipelineStageFlags, PolygonMode,
    PresentMode, PrimitiveTopology, ResourceKind, SampleCount, ShaderStageFlags, StoreOp, SubpassRef,
    SurfaceCapabilities, SurfaceFormat, TextureFormat, VertexFormat, VertexInputRate,
};

// ===== FORMATS =====

pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_SFLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Engine format for a Vulkan format, `None` for formats the engine does not model
pub(crate) fn format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::R16G16B16A16_SFLOAT => Some(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R32G32B32A32_SFLOAT => Some(TextureFormat::R32G32B32A32_SFLOAT),
        vk::Format::R32_SFLOAT => Some(TextureFormat::R32_SFLOAT),
        vk::Format::D16_UNORM => Some(TextureFormat::D16_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_SFLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT => Some(TextureFormat::D32_SFLOAT_S8_UINT),
        _ => None,
    }
}

pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        VertexFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        VertexFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        VertexFormat::R32_UINT => vk::Format::R32_UINT,
        VertexFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
    }
}

/// Image aspect of a format (depth formats with stencil include the stencil aspect)
pub(crate) fn aspect_for_format(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

// ===== SAMPLES =====

pub(crate) fn sample_count_to_vk(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::S16 => vk::SampleCountFlags::TYPE_16,
        SampleCount::S32 => vk::SampleCountFlags::TYPE_32,
        SampleCount::S64 => vk::SampleCountFlags::TYPE_64,
    }
}

/// Highest sample count present in a set of supported counts
pub(crate) fn highest_sample_count(supported: vk::SampleCountFlags) -> SampleCount {
    [
        SampleCount::S64,
        SampleCount::S32,
        SampleCount::S16,
        SampleCount::S8,
        SampleCount::S4,
        SampleCount::S2,
    ]
    .into_iter()
    .find(|samples| supported.contains(sample_count_to_vk(*samples)))
    .unwrap_or(SampleCount::S1)
}

// ===== IMAGES =====

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnlyOptimal => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Access mask and stage of the work that uses an image in a given layout
///
/// Used on both sides of a layout transition barrier.
pub(crate) fn layout_access_and_stage(layout: ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        ImageLayout::General => (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        ImageLayout::ColorAttachmentOptimal => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        ImageLayout::DepthStencilAttachmentOptimal => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        ImageLayout::DepthStencilReadOnlyOptimal => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ImageLayout::ShaderReadOnlyOptimal => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
        ),
        ImageLayout::TransferSrcOptimal => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::TransferDstOptimal => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::PresentSrc => (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    }
}

/// Image usage flags for an attachment image
pub(crate) fn image_usage_to_vk(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(ImageUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::TRANSIENT) {
        flags |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT;
    }
    if usage.contains(ImageUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    flags
}

pub(crate) fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

pub(crate) fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

// ===== RENDER PASSES =====

pub(crate) fn load_op_to_vk(load_op: LoadOp) -> vk::AttachmentLoadOp {
    match load_op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_to_vk(store_op: StoreOp) -> vk::AttachmentStoreOp {
    match store_op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(crate) fn subpass_ref_to_vk(subpass: SubpassRef) -> u32 {
    match subpass {
        SubpassRef::External => vk::SUBPASS_EXTERNAL,
        SubpassRef::Index(index) => index,
    }
}

pub(crate) fn pipeline_stages_to_vk(stages: PipelineStageFlags) -> vk::PipelineStageFlags {
    const MAPPING: [(PipelineStageFlags, vk::PipelineStageFlags); 10] = [
        (PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
        (PipelineStageFlags::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
        (PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        (PipelineStageFlags::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS),
        (PipelineStageFlags::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::LATE_FRAGMENT_TESTS),
        (PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStageFlags::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER),
        (PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        (PipelineStageFlags::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        (PipelineStageFlags::ALL_COMMANDS, vk::PipelineStageFlags::ALL_COMMANDS),
    ];

    MAPPING
        .iter()
        .filter(|(engine, _)| stages.contains(*engine))
        .fold(vk::PipelineStageFlags::empty(), |acc, (_, vk_stage)| acc | *vk_stage)
}

pub(crate) fn access_flags_to_vk(access: AccessFlags) -> vk::AccessFlags {
    const MAPPING: [(AccessFlags, vk::AccessFlags); 10] = [
        (AccessFlags::SHADER_READ, vk::AccessFlags::SHADER_READ),
        (AccessFlags::SHADER_WRITE, vk::AccessFlags::SHADER_WRITE),
        (AccessFlags::COLOR_ATTACHMENT_READ, vk::AccessFlags::COLOR_ATTACHMENT_READ),
        (AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        (AccessFlags::TRANSFER_READ, vk::AccessFlags::TRANSFER_READ),
        (AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_WRITE),
        (AccessFlags::MEMORY_READ, vk::AccessFlags::MEMORY_READ),
        (AccessFlags::MEMORY_WRITE, vk::AccessFlags::MEMORY_WRITE),
    ];

    MAPPING
        .iter()
        .filter(|(engine, _)| access.contains(*engine))
        .fold(vk::AccessFlags::empty(), |acc, (_, vk_access)| acc | *vk_access)
}

pub(crate) fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match *value {
        ClearValue::Color(rgba) => vk::ClearValue {
            color: vk::ClearColorValue { float32: rgba },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

// ===== PIPELINES =====

pub(crate) fn shader_stages_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stages.contains(ShaderStageFlags::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    flags
}

/// Vulkan dynamic states for the fixed-function flags (push constants are not a state)
pub(crate) fn dynamic_states_to_vk(flags: DynamicStateFlags) -> Vec<vk::DynamicState> {
    [
        (DynamicStateFlags::VIEWPORT, vk::DynamicState::VIEWPORT),
        (DynamicStateFlags::SCISSOR, vk::DynamicState::SCISSOR),
        (DynamicStateFlags::LINE_WIDTH, vk::DynamicState::LINE_WIDTH),
        (DynamicStateFlags::DEPTH_BIAS, vk::DynamicState::DEPTH_BIAS),
        (DynamicStateFlags::BLEND_CONSTANTS, vk::DynamicState::BLEND_CONSTANTS),
        (DynamicStateFlags::DEPTH_BOUNDS, vk::DynamicState::DEPTH_BOUNDS),
    ]
    .into_iter()
    .filter(|(flag, _)| flags.contains(*flag))
    .map(|(_, state)| state)
    .collect()
}

pub(crate) fn resource_kind_to_vk(kind: ResourceKind) -> vk::DescriptorType {
    match kind {
        ResourceKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        ResourceKind::SampledImage => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
    }
}

pub(crate) fn input_rate_to_vk(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

// ===== SURFACE =====

pub(crate) fn surface_format_from_vk(format: vk::SurfaceFormatKHR) -> Option<SurfaceFormat> {
    let color_space = if format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR {
        ColorSpace::SrgbNonLinear
    } else {
        ColorSpace::Other(format.color_space.as_raw())
    };
    format_from_vk(format.format).map(|format| SurfaceFormat { format, color_space })
}

pub(crate) fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonLinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub(crate) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub(crate) fn composite_alpha_from_vk(flags: vk::CompositeAlphaFlagsKHR) -> CompositeAlphaFlags {
    let mut alpha = CompositeAlphaFlags::empty();
    if flags.contains(vk::CompositeAlphaFlagsKHR::OPAQUE) {
        alpha |= CompositeAlphaFlags::OPAQUE;
    }
    if flags.contains(vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED) {
        alpha |= CompositeAlphaFlags::PRE_MULTIPLIED;
    }
    if flags.contains(vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED) {
        alpha |= CompositeAlphaFlags::POST_MULTIPLIED;
    }
    if flags.contains(vk::CompositeAlphaFlagsKHR::INHERIT) {
        alpha |= CompositeAlphaFlags::INHERIT;
    }
    alpha
}

/// Vulkan composite alpha for a single chosen mode
pub(crate) fn composite_alpha_to_vk(alpha: CompositeAlphaFlags) -> vk::CompositeAlphaFlagsKHR {
    if alpha.contains(CompositeAlphaFlags::OPAQUE) {
        vk::CompositeAlphaFlagsKHR::OPAQUE
    } else if alpha.contains(CompositeAlphaFlags::PRE_MULTIPLIED) {
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED
    } else if alpha.contains(CompositeAlphaFlags::POST_MULTIPLIED) {
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED
    } else {
        vk::CompositeAlphaFlagsKHR::INHERIT
    }
}

pub(crate) fn surface_capabilities_from_vk(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent: extent_from_vk(caps.current_extent),
        min_image_extent: extent_from_vk(caps.min_image_extent),
        max_image_extent: extent_from_vk(caps.max_image_extent),
        supported_composite_alpha: composite_alpha_from_vk(caps.supported_composite_alpha),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
