/// Pixel formats, sample counts and extents

/// Texture / attachment pixel format
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    // Color formats
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_SFLOAT,

    // Depth formats
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl TextureFormat {
    /// Whether this is a depth (or depth-stencil) format
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_SFLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// Whether this format carries a stencil component
    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }
}

/// Depth formats tried in order when looking for a supported depth attachment format
pub const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_SFLOAT,
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleCount {
    /// 1 sample (no multisampling)
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
}

impl SampleCount {
    /// Number of samples per pixel
    pub fn count(self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
            SampleCount::S32 => 32,
            SampleCount::S64 => 64,
        }
    }

    /// Sample count from a number of samples (must be a supported power of two)
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(SampleCount::S1),
            2 => Some(SampleCount::S2),
            4 => Some(SampleCount::S4),
            8 => Some(SampleCount::S8),
            16 => Some(SampleCount::S16),
            32 => Some(SampleCount::S32),
            64 => Some(SampleCount::S64),
            _ => None,
        }
    }

    /// The lower of this count and the device maximum
    pub fn clamp_to(self, max: SampleCount) -> Self {
        self.min(max)
    }

    /// Whether this count means multisampling
    pub fn is_multisampled(self) -> bool {
        self != SampleCount::S1
    }
}

/// 2D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area extent (minimized window)
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
