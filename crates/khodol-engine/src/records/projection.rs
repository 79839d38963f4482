use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Projection constant block shared by every stage of a draw.
///
/// 64 bytes, column-major. Supplied by value per draw (or per frame) and never
/// mutated while a draw is in flight; the next draw gets a fresh copy.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ProjectionConstant {
    pub matrix: [[f32; 4]; 4],
}

impl ProjectionConstant {
    #[inline]
    pub fn new(matrix: Mat4) -> Self {
        Self { matrix: matrix.to_cols_array_2d() }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix)
    }
}

impl Default for ProjectionConstant {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Mat4> for ProjectionConstant {
    fn from(matrix: Mat4) -> Self {
        Self::new(matrix)
    }
}
