use glam::Vec3;

use super::MeshVertex;
use crate::stage::DrawError;

/// Indexed triangle list for the instanced pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

// (normal, u axis, v axis); u × v == normal keeps every face CCW from outside.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Unit quad centered on the origin in the XY plane, facing +Z.
    ///
    /// UV (0,0) is the top-left corner.
    pub fn quad() -> Self {
        let mut mesh = Self::default();
        mesh.push_face(Vec3::Z, Vec3::X, Vec3::Y, 0.0);
        mesh
    }

    /// Unit cube centered on the origin with per-face normals (24 vertices).
    pub fn cube() -> Self {
        let mut mesh = Self::default();
        for (n, u, v) in CUBE_FACES {
            mesh.push_face(Vec3::from_array(n), Vec3::from_array(u), Vec3::from_array(v), 0.5);
        }
        mesh
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    fn push_face(&mut self, normal: Vec3, u: Vec3, v: Vec3, offset: f32) {
        let base = self.vertices.len() as u32;
        let center = normal * offset;
        let corners = [
            (-0.5, -0.5, [0.0, 1.0]),
            (0.5, -0.5, [1.0, 1.0]),
            (0.5, 0.5, [1.0, 0.0]),
            (-0.5, 0.5, [0.0, 0.0]),
        ];
        for (su, sv, uv) in corners {
            let p = center + u * su + v * sv;
            self.vertices
                .push(MeshVertex::new(p.to_array(), uv, normal.to_array()));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Rejects index lists that are not whole triangles or that reach past
/// `vertex_count`.
pub fn check_indices(indices: &[u32], vertex_count: usize) -> Result<(), DrawError> {
    if indices.len() % 3 != 0 {
        return Err(DrawError::IncompleteTriangle(indices.len()));
    }
    match indices.iter().position(|&i| i as usize >= vertex_count) {
        Some(position) => Err(DrawError::IndexOutOfRange {
            position,
            index: indices[position],
            vertex_count,
        }),
        None => Ok(()),
    }
}
