//! Flat/UI stages: a single projection, no model matrix, no texture array.

use glam::{Vec2, Vec4};

use super::io::{IoSlot, IoType, IoValue, StageInterface, Varyings};
use super::texture::{Image, Sampler};
use super::transform::transform_flat;
use super::{FragmentStage, VertexOutput, VertexStage};
use crate::records::{FlatTexturedVertex, FlatVertex, ProjectionConstant};

// ── vertex color ──────────────────────────────────────────────────────────

pub const FLAT_COLOR_VARYINGS: StageInterface = StageInterface::new(
    "flat color varyings",
    &[IoSlot::perspective(0, "color", IoType::Vec4)],
);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlatColorVaryings {
    pub color: Vec4,
}

impl Varyings for FlatColorVaryings {
    const INTERFACE: StageInterface = FLAT_COLOR_VARYINGS;

    fn write_slots(&self, out: &mut Vec<IoValue>) {
        out.push(IoValue::Vec4(self.color));
    }

    fn read_slots(slots: &[IoValue]) -> Option<Self> {
        let [color] = slots else {
            return None;
        };
        Some(Self { color: color.as_vec4()? })
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct FlatColorVertexStage;

impl VertexStage for FlatColorVertexStage {
    type Vertex = FlatVertex;
    type Instance = ();
    type Output = FlatColorVaryings;

    fn run(&self, constants: &ProjectionConstant, vertex: &FlatVertex, _: &()) -> VertexOutput<FlatColorVaryings> {
        VertexOutput {
            clip_position: transform_flat(constants.matrix(), vertex.position()),
            varyings: FlatColorVaryings { color: vertex.color() },
        }
    }
}

/// Emits the interpolated vertex color.
#[derive(Debug, Copy, Clone, Default)]
pub struct FlatColorFragmentStage;

impl FragmentStage for FlatColorFragmentStage {
    type Input = FlatColorVaryings;

    fn run(&self, input: &FlatColorVaryings) -> Vec4 {
        input.color
    }
}

// ── single texture ────────────────────────────────────────────────────────

pub const FLAT_TEXTURED_VARYINGS: StageInterface = StageInterface::new(
    "flat textured varyings",
    &[IoSlot::perspective(0, "uv", IoType::Vec2)],
);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlatTexturedVaryings {
    pub uv: Vec2,
}

impl Varyings for FlatTexturedVaryings {
    const INTERFACE: StageInterface = FLAT_TEXTURED_VARYINGS;

    fn write_slots(&self, out: &mut Vec<IoValue>) {
        out.push(IoValue::Vec2(self.uv));
    }

    fn read_slots(slots: &[IoValue]) -> Option<Self> {
        let [uv] = slots else {
            return None;
        };
        Some(Self { uv: uv.as_vec2()? })
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct FlatTexturedVertexStage;

impl VertexStage for FlatTexturedVertexStage {
    type Vertex = FlatTexturedVertex;
    type Instance = ();
    type Output = FlatTexturedVaryings;

    fn run(
        &self,
        constants: &ProjectionConstant,
        vertex: &FlatTexturedVertex,
        _: &(),
    ) -> VertexOutput<FlatTexturedVaryings> {
        VertexOutput {
            clip_position: transform_flat(constants.matrix(), vertex.position()),
            varyings: FlatTexturedVaryings { uv: vertex.uv() },
        }
    }
}

/// Fixed single-image lookup. No id, so no divergence concern.
#[derive(Debug, Copy, Clone)]
pub struct FlatTexturedFragmentStage<'a> {
    pub image: &'a Image,
    pub sampler: Sampler,
}

impl<'a> FlatTexturedFragmentStage<'a> {
    pub fn new(image: &'a Image, sampler: Sampler) -> Self {
        Self { image, sampler }
    }
}

impl FragmentStage for FlatTexturedFragmentStage<'_> {
    type Input = FlatTexturedVaryings;

    fn run(&self, input: &FlatTexturedVaryings) -> Vec4 {
        self.sampler.sample(self.image, input.uv)
    }
}
