//! Per-draw data records shared by the CPU stages and the GPU renderers.
//!
//! Every record is `#[repr(C)]` + `Pod` so the exact bytes the CPU stages read
//! are the bytes uploaded to vertex/uniform buffers.
//!
//! Vertex buffer slots:
//! - slot 0: per-vertex records (`MeshVertex`, `FlatVertex`, `FlatTexturedVertex`)
//! - slot 1: per-instance records (`InstanceRecord`)

mod geometry;
mod instance;
mod projection;
mod vertex;

pub use geometry::{MeshData, check_indices};
pub use instance::{InstanceRecord, TextureId, check_texture_ids};
pub use projection::ProjectionConstant;
pub use vertex::{FlatTexturedVertex, FlatVertex, MeshVertex};
