use glam::{Vec3, Vec4};

/// `normalize(1, 1, 1)`.
pub const LIGHT_DIRECTION: Vec3 = Vec3::splat(0.577_350_26);

/// Lower bound of the diffuse term.
pub const AMBIENT_FLOOR: f32 = 0.2;

/// One-term Lambert with an ambient floor: `clamp(dot(n, L), 0.2, 1.0)`.
///
/// `normal` is used as interpolated; it is not renormalized.
#[inline]
pub fn lambert_term(normal: Vec3) -> f32 {
    normal.dot(LIGHT_DIRECTION).clamp(AMBIENT_FLOOR, 1.0)
}

/// Scales albedo rgb by the Lambert term. Alpha passes through.
#[inline]
pub fn shade(albedo: Vec4, normal: Vec3) -> Vec4 {
    (albedo.truncate() * lambert_term(normal)).extend(albedo.w)
}

/// Fragment lighting variant. Each variant is its own fragment entry point,
/// so the shader never branches on it.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Lighting {
    #[default]
    Lambert,
    Unlit,
}

impl Lighting {
    #[inline]
    pub fn apply(self, albedo: Vec4, normal: Vec3) -> Vec4 {
        match self {
            Lighting::Lambert => shade(albedo, normal),
            Lighting::Unlit => albedo,
        }
    }

    pub const fn fragment_entry_point(self) -> &'static str {
        match self {
            Lighting::Lambert => "fs_lit",
            Lighting::Unlit => "fs_unlit",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Lighting::Lambert => Lighting::Unlit,
            Lighting::Unlit => Lighting::Lambert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_direction_is_unit() {
        assert!((LIGHT_DIRECTION.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn facing_away_hits_ambient_floor_exactly() {
        for n in [
            -LIGHT_DIRECTION,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::ZERO,
            -LIGHT_DIRECTION * 10.0,
        ] {
            assert!(n.dot(LIGHT_DIRECTION) <= 0.0);
            assert_eq!(lambert_term(n), 0.2);
        }
    }

    #[test]
    fn facing_light_hits_ceiling_exactly() {
        // Unnormalized normals can exceed one.
        for n in [LIGHT_DIRECTION * 1.01, Vec3::ONE, Vec3::new(2.0, 0.0, 0.0)] {
            assert!(n.dot(LIGHT_DIRECTION) >= 1.0);
            assert_eq!(lambert_term(n), 1.0);
        }
    }

    #[test]
    fn term_stays_in_range() {
        for i in -20..=20 {
            for j in -20..=20 {
                let n = Vec3::new(i as f32 / 10.0, j as f32 / 10.0, 0.3);
                let t = lambert_term(n);
                assert!((0.2..=1.0).contains(&t));
            }
        }
    }

    #[test]
    fn alpha_is_untouched() {
        let albedo = Vec4::new(0.8, 0.4, 0.2, 0.5);
        let lit = shade(albedo, Vec3::X);
        assert_eq!(lit.w, 0.5);
        let t = lambert_term(Vec3::X);
        assert_eq!(lit.truncate(), albedo.truncate() * t);
    }

    #[test]
    fn unlit_passes_albedo() {
        let albedo = Vec4::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(Lighting::Unlit.apply(albedo, -Vec3::ONE), albedo);
        assert_eq!(Lighting::Lambert.toggled(), Lighting::Unlit);
    }
}
