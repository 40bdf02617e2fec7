/// Device pipeline objects and their descriptors
///
/// These describe what the device needs to compile a pipeline. The
/// engine-level `GraphicsPipeline` / `ComputePipeline` wrap the device object
/// with its render target back-reference and its cache.

use std::any::Any;
use bitflags::bitflags;
use crate::error::Result;
use crate::graphics_device::{Buffer, Extent2D, Image, RenderPass, SampleCount};

bitflags! {
    /// Shader stages
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

bitflags! {
    /// Pipeline state set at record time instead of baked into the pipeline
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DynamicStateFlags: u32 {
        const VIEWPORT = 1 << 0;
        const SCISSOR = 1 << 1;
        const LINE_WIDTH = 1 << 2;
        const DEPTH_BIAS = 1 << 3;
        const BLEND_CONSTANTS = 1 << 4;
        const DEPTH_BOUNDS = 1 << 5;
        /// Push constants are recorded per draw (not a fixed-function state)
        const PUSH_CONSTANTS = 1 << 6;
    }
}

/// Graphics or compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

// ===== RESOURCE LAYOUT =====

/// Kind of resource a binding slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    UniformBuffer,
    StorageBuffer,
    /// Image + sampler
    SampledImage,
}

/// One binding slot of a resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLayoutBinding {
    pub binding: u32,
    pub kind: ResourceKind,
    pub stages: ShaderStageFlags,
}

/// Layout of one resource set (index = set number)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLayout {
    pub bindings: Vec<ResourceLayoutBinding>,
}

/// Push constant range descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

// ===== VERTEX INPUT =====

/// Vertex attribute format
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,
    R8G8B8A8_UNORM,
}

impl VertexFormat {
    /// Size in bytes
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::R32_SFLOAT | VertexFormat::R32_UINT | VertexFormat::R8G8B8A8_UNORM => 4,
            VertexFormat::R32G32_SFLOAT => 8,
            VertexFormat::R32G32B32_SFLOAT => 12,
            VertexFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== FIXED FUNCTION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    /// Used unless `DynamicStateFlags::LINE_WIDTH` is set
    pub line_width: f32,
    /// Enables depth bias; the factors come from the dynamic state container
    pub depth_bias_enable: bool,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
            depth_bias_enable: false,
        }
    }
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare_op: CompareOp,
    /// Enables the depth bounds test; bounds come from the dynamic state container
    pub bounds_test_enable: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enable: true,
            write_enable: true,
            compare_op: CompareOp::Less,
            bounds_test_enable: false,
        }
    }
}

// ===== DESCRIPTORS =====

/// Everything needed to compile a graphics pipeline, independent of the target
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    /// SPIR-V words, entry point `main`
    pub vertex_shader: Vec<u32>,
    /// SPIR-V words, entry point `main` (none for depth-only passes)
    pub fragment_shader: Option<Vec<u32>>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    /// Standard alpha blending on every color attachment
    pub blend_enable: bool,
    pub dynamic_states: DynamicStateFlags,
    /// Resource set layouts, index = set number
    pub resource_layouts: Vec<ResourceLayout>,
    pub push_constants: Option<PushConstantRange>,
}

impl Default for GraphicsPipelineDesc {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: None,
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            rasterization: RasterizationState::default(),
            depth: DepthState::default(),
            blend_enable: false,
            dynamic_states: DynamicStateFlags::VIEWPORT | DynamicStateFlags::SCISSOR,
            resource_layouts: Vec::new(),
            push_constants: None,
        }
    }
}

/// Compute pipeline descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputePipelineDesc {
    /// SPIR-V words, entry point `main`
    pub shader: Vec<u32>,
    pub resource_layouts: Vec<ResourceLayout>,
    pub push_constants: Option<PushConstantRange>,
}

/// Graphics pipeline creation against a concrete render pass
pub struct GraphicsPipelineCreateInfo<'a> {
    /// Debug name
    pub name: &'a str,
    pub desc: &'a GraphicsPipelineDesc,
    pub render_pass: &'a dyn RenderPass,
    /// Baked into the pipeline when viewport/scissor are not dynamic
    pub extent: Extent2D,
    pub samples: SampleCount,
    pub color_attachment_count: u32,
    pub cache: Option<&'a dyn PipelineCache>,
}

/// Compute pipeline creation
pub struct ComputePipelineCreateInfo<'a> {
    pub name: &'a str,
    pub desc: &'a ComputePipelineDesc,
    pub cache: Option<&'a dyn PipelineCache>,
}

/// Resource bound into a resource package slot
pub enum BoundResource<'a> {
    Buffer(&'a dyn Buffer),
    Image(&'a dyn Image),
}

/// One entry of a resource package
///
/// The resources must outlive every command buffer that uses the package.
pub struct ResourceBinding<'a> {
    pub binding: u32,
    pub resource: BoundResource<'a>,
}

// ===== DEVICE OBJECTS =====

/// Compiled device pipeline (program + layout)
pub trait PipelineObject: Send + Sync {
    fn bind_point(&self) -> PipelineBindPoint;

    fn as_any(&self) -> &dyn Any;
}

/// Driver pipeline compilation cache
pub trait PipelineCache: Send + Sync {
    /// Serialized cache contents (opaque, driver specific)
    fn data(&self) -> Result<Vec<u8>>;

    fn as_any(&self) -> &dyn Any;
}

/// Immutable set of resource bindings for one set index of one pipeline layout
pub trait ResourcePackage: Send + Sync {
    /// Set index this package was built for
    fn set(&self) -> u32;

    fn as_any(&self) -> &dyn Any;
}
