/// Graphics and compute pipelines, and pipeline cache persistence

pub mod compute_pipeline;
pub mod graphics_pipeline;
pub mod pipeline_cache;

pub use compute_pipeline::*;
pub use graphics_pipeline::*;
pub use pipeline_cache::*;
