//! Shader stages as plain Rust.
//!
//! Each stage is a `Sync` value whose `run` is a pure function of its inputs.
//! The same logic is expressed in WGSL under `render/shaders`; the software
//! executor in [`crate::raster`] drives these types directly.

pub mod error;
pub mod flat;
pub mod io;
pub mod lighting;
pub mod mesh;
pub mod texture;
pub mod transform;

use glam::Vec4;

use crate::records::ProjectionConstant;

pub use error::{DrawError, InterfaceError, LinkError, SlotMismatch, TextureError};
pub use flat::{
    FlatColorFragmentStage, FlatColorVaryings, FlatColorVertexStage, FlatTexturedFragmentStage,
    FlatTexturedVaryings, FlatTexturedVertexStage,
};
pub use io::{Interpolation, IoSlot, IoType, IoValue, Linkage, StageInterface, Varyings, link};
pub use lighting::{AMBIENT_FLOOR, LIGHT_DIRECTION, Lighting, lambert_term, shade};
pub use mesh::{MeshFragmentStage, MeshVaryings, MeshVertexStage};
pub use texture::{Access, AddressMode, ArrayIndex, Filter, Image, Sampler, TextureTable};
pub use transform::{transform_flat, transform_instanced};

/// What one vertex invocation hands to the rasterizer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexOutput<O> {
    pub clip_position: Vec4,
    pub varyings: O,
}

pub trait VertexStage: Sync {
    type Vertex;
    /// Per-instance record; `()` for non-instanced stages.
    type Instance;
    type Output: Varyings;

    fn run(
        &self,
        constants: &ProjectionConstant,
        vertex: &Self::Vertex,
        instance: &Self::Instance,
    ) -> VertexOutput<Self::Output>;
}

pub trait FragmentStage: Sync {
    type Input: Varyings;

    fn run(&self, input: &Self::Input) -> Vec4;
}
