//! wgpu renderers for the instanced and flat stage pairs.
//!
//! Each renderer lazily owns its GPU resources (pipelines, buffers, bind
//! groups) and records one pass per call into the frame's encoder.
//!
//! Bindings shared by every pipeline:
//! - group 0, binding 0: projection constant (64-byte uniform, vertex stage)
//! - group 1: textures (array + sampler for instanced, single view + sampler
//!   for flat textured)

mod common;
mod ctx;
mod flat;
mod instanced;
mod mesh;
pub mod shader_source;
mod texture_table;

pub use common::{DEPTH_FORMAT, IMAGE_FORMAT, create_depth_texture};
pub use ctx::{RenderCtx, RenderTarget};
pub use flat::FlatRenderer;
pub use instanced::{InstanceBatch, InstancedMeshRenderer};
pub use mesh::GpuMesh;
pub use texture_table::{GpuImage, GpuTextureTable, TextureTableConfig};
