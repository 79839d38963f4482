use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::stage::{ArrayIndex, DrawError};

/// Slot of an image in the bound texture array.
///
/// The id is only meaningful against the table bound for the draw. Ids read
/// back out of stage varyings differ per invocation, so the only way to turn
/// one into an array index is [`TextureId::non_uniform`].
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct TextureId(pub u32);

impl TextureId {
    #[inline]
    pub const fn new(slot: u32) -> Self {
        Self(slot)
    }

    #[inline]
    pub const fn slot(self) -> u32 {
        self.0
    }

    /// Declares divergence-tolerant access for this id.
    #[inline]
    pub const fn non_uniform(self) -> ArrayIndex {
        ArrayIndex::non_uniform(self.0)
    }
}

/// One drawn copy of a shared mesh.
///
/// Layout (68 bytes, tightly packed, step mode = instance):
///
///  offset  0  model[0]    [f32; 4]   loc 3
///  offset 16  model[1]    [f32; 4]   loc 4
///  offset 32  model[2]    [f32; 4]   loc 5
///  offset 48  model[3]    [f32; 4]   loc 6
///  offset 64  texture_id  u32        loc 7
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    pub model: [[f32; 4]; 4],
    pub texture_id: u32,
}

impl InstanceRecord {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        3 => Float32x4, // model column 0
        4 => Float32x4, // model column 1
        5 => Float32x4, // model column 2
        6 => Float32x4, // model column 3
        7 => Uint32     // texture id
    ];

    #[inline]
    pub fn new(model: Mat4, texture_id: TextureId) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            texture_id: texture_id.slot(),
        }
    }

    #[inline]
    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    #[inline]
    pub fn texture_id(&self) -> TextureId {
        TextureId(self.texture_id)
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRecord>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Rejects the first instance whose texture id falls outside `[0, table_len)`.
///
/// Nothing checks ids once a draw reaches the GPU, so both the CPU executor and
/// the wgpu renderer run this before recording the draw.
pub fn check_texture_ids(instances: &[InstanceRecord], table_len: usize) -> Result<(), DrawError> {
    match instances
        .iter()
        .position(|inst| inst.texture_id as usize >= table_len)
    {
        Some(instance) => Err(DrawError::TextureOutOfRange {
            instance,
            id: instances[instance].texture_id,
            len: table_len,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn record_is_68_bytes_with_id_last() {
        assert_eq!(std::mem::size_of::<InstanceRecord>(), 68);
        let rec = InstanceRecord::new(Mat4::IDENTITY, TextureId(9));
        let bytes = bytemuck::bytes_of(&rec);
        let id: u32 = bytemuck::pod_read_unaligned(&bytes[64..68]);
        assert_eq!(id, 9);
    }

    #[test]
    fn layout_matches_record() {
        let layout = InstanceRecord::layout();
        assert_eq!(layout.array_stride, 68);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
        let locs: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locs, vec![3, 4, 5, 6, 7]);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48, 64]);
        assert_eq!(layout.attributes[4].format, wgpu::VertexFormat::Uint32);
    }

    #[test]
    fn model_round_trips_through_columns() {
        let m = Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(InstanceRecord::new(m, TextureId(0)).model(), m);
    }

    #[test]
    fn ids_inside_table_pass() {
        let instances = [
            InstanceRecord::new(Mat4::IDENTITY, TextureId(0)),
            InstanceRecord::new(Mat4::IDENTITY, TextureId(1)),
        ];
        assert!(check_texture_ids(&instances, 2).is_ok());
    }

    #[test]
    fn first_out_of_range_id_is_reported() {
        let instances = [
            InstanceRecord::new(Mat4::IDENTITY, TextureId(0)),
            InstanceRecord::new(Mat4::IDENTITY, TextureId(5)),
            InstanceRecord::new(Mat4::IDENTITY, TextureId(7)),
        ];
        assert_eq!(
            check_texture_ids(&instances, 2),
            Err(DrawError::TextureOutOfRange { instance: 1, id: 5, len: 2 })
        );
    }

    #[test]
    fn empty_table_rejects_everything() {
        let instances = [InstanceRecord::new(Mat4::IDENTITY, TextureId(0))];
        assert!(check_texture_ids(&instances, 0).is_err());
        assert!(check_texture_ids(&[], 0).is_ok());
    }
}
