use glam::{Mat4, Vec3, Vec4};

/// Clip position of a mesh vertex: `P · M · (p, 1)`.
///
/// No finiteness checks; a degenerate matrix gives degenerate geometry.
#[inline]
pub fn transform_instanced(projection: Mat4, model: Mat4, position: Vec3) -> Vec4 {
    projection * (model * position.extend(1.0))
}

/// Clip position of a flat vertex: `P · position`.
#[inline]
pub fn transform_flat(projection: Mat4, position: Vec4) -> Vec4 {
    projection * position
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_position() {
        for p in [Vec3::ZERO, Vec3::new(0.25, -0.5, 0.75), Vec3::new(-3.0, 7.0, 11.0)] {
            assert_eq!(transform_instanced(Mat4::IDENTITY, Mat4::IDENTITY, p), p.extend(1.0));
        }
        let q = Vec4::new(0.1, 0.2, 0.3, 1.0);
        assert_eq!(transform_flat(Mat4::IDENTITY, q), q);
    }

    #[test]
    fn model_applies_before_projection() {
        let model = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let projection = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let clip = transform_instanced(projection, model, Vec3::ZERO);
        // Translate then scale: (0 + 1) * 2.
        assert_eq!(clip, Vec4::new(2.0, 0.0, 0.0, 1.0));
    }
}
