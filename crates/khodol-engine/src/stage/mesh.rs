//! Instanced-mesh stages: per-instance transform, bindless texture lookup.

use glam::{Vec2, Vec3, Vec4};

use super::io::{IoSlot, IoType, IoValue, StageInterface, Varyings};
use super::lighting::Lighting;
use super::texture::TextureTable;
use super::transform::transform_instanced;
use super::{FragmentStage, VertexOutput, VertexStage};
use crate::records::{InstanceRecord, MeshVertex, ProjectionConstant, TextureId};

pub const MESH_VARYINGS: StageInterface = StageInterface::new(
    "mesh varyings",
    &[
        IoSlot::perspective(0, "uv", IoType::Vec2),
        IoSlot::perspective(1, "normal", IoType::Vec3),
        IoSlot::flat(2, "texture_id", IoType::U32),
    ],
);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshVaryings {
    pub uv: Vec2,
    pub normal: Vec3,
    pub texture_id: TextureId,
}

impl Varyings for MeshVaryings {
    const INTERFACE: StageInterface = MESH_VARYINGS;

    fn write_slots(&self, out: &mut Vec<IoValue>) {
        out.push(IoValue::Vec2(self.uv));
        out.push(IoValue::Vec3(self.normal));
        out.push(IoValue::U32(self.texture_id.slot()));
    }

    fn read_slots(slots: &[IoValue]) -> Option<Self> {
        let [uv, normal, texture_id] = slots else {
            return None;
        };
        Some(Self {
            uv: uv.as_vec2()?,
            normal: normal.as_vec3()?,
            texture_id: TextureId::new(texture_id.as_u32()?),
        })
    }
}

/// Vertex Stage A.
#[derive(Debug, Copy, Clone, Default)]
pub struct MeshVertexStage;

impl VertexStage for MeshVertexStage {
    type Vertex = MeshVertex;
    type Instance = InstanceRecord;
    type Output = MeshVaryings;

    fn run(
        &self,
        constants: &ProjectionConstant,
        vertex: &MeshVertex,
        instance: &InstanceRecord,
    ) -> VertexOutput<MeshVaryings> {
        VertexOutput {
            clip_position: transform_instanced(constants.matrix(), instance.model(), vertex.position()),
            varyings: MeshVaryings {
                uv: vertex.uv(),
                normal: vertex.normal(),
                texture_id: instance.texture_id(),
            },
        }
    }
}

/// Fragment Stage A: samples the table slot named by the flat texture id.
#[derive(Debug, Copy, Clone)]
pub struct MeshFragmentStage<'a> {
    pub textures: &'a TextureTable,
    pub lighting: Lighting,
}

impl<'a> MeshFragmentStage<'a> {
    pub fn new(textures: &'a TextureTable, lighting: Lighting) -> Self {
        Self { textures, lighting }
    }
}

impl FragmentStage for MeshFragmentStage<'_> {
    type Input = MeshVaryings;

    fn run(&self, input: &MeshVaryings) -> Vec4 {
        let albedo = self.textures.sample(input.texture_id.non_uniform(), input.uv);
        self.lighting.apply(albedo, input.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MeshData;
    use crate::stage::{Image, link};
    use glam::Mat4;

    #[test]
    fn varyings_cover_their_interface() {
        let v = MeshVaryings { uv: Vec2::new(0.25, 0.75), normal: Vec3::Y, texture_id: TextureId(3) };
        let mut slots = Vec::new();
        v.write_slots(&mut slots);
        let types: Vec<IoType> = slots.iter().map(IoValue::ty).collect();
        let declared: Vec<IoType> = MESH_VARYINGS.slots.iter().map(|s| s.ty).collect();
        assert_eq!(types, declared);
        assert_eq!(MeshVaryings::read_slots(&slots), Some(v));
        assert_eq!(MeshVaryings::read_slots(&slots[..2]), None);
    }

    #[test]
    fn uv_survives_vertex_to_fragment() {
        let linkage = link(&MESH_VARYINGS, &MESH_VARYINGS).unwrap();
        let mesh = MeshData::cube();
        let instance = InstanceRecord::new(Mat4::from_rotation_y(0.3), TextureId(1));
        let constants = ProjectionConstant::identity();

        let mut written = Vec::new();
        let mut read = Vec::new();
        for vertex in &mesh.vertices {
            let out = MeshVertexStage.run(&constants, vertex, &instance);
            written.clear();
            out.varyings.write_slots(&mut written);
            // Weight 1 on the vertex itself: fragment sees exactly what was written.
            linkage.interpolate([&written, &written, &written], [1.0, 0.0, 0.0], &mut read);
            let input = MeshVaryings::read_slots(&read).unwrap();
            assert_eq!(input.uv, vertex.uv());
            assert_eq!(input.texture_id, TextureId(1));
        }
    }

    #[test]
    fn fragment_samples_per_instance_image() {
        let mut table = TextureTable::default();
        let red = table.push(Image::solid(2, 2, Vec4::new(1.0, 0.0, 0.0, 1.0)));
        let blue = table.push(Image::solid(2, 2, Vec4::new(0.0, 0.0, 1.0, 1.0)));
        let fs = MeshFragmentStage::new(&table, Lighting::Unlit);

        let input = |texture_id| MeshVaryings { uv: Vec2::splat(0.5), normal: Vec3::Z, texture_id };
        assert_eq!(fs.run(&input(red)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(fs.run(&input(blue)), Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn lit_fragment_scales_rgb_only() {
        let mut table = TextureTable::default();
        let id = table.push(Image::solid(1, 1, Vec4::new(1.0, 1.0, 1.0, 0.5)));
        let fs = MeshFragmentStage::new(&table, Lighting::Lambert);
        let out = fs.run(&MeshVaryings { uv: Vec2::ZERO, normal: -Vec3::ONE, texture_id: id });
        assert_eq!(out, Vec4::new(0.2, 0.2, 0.2, 0.5));
    }
}
