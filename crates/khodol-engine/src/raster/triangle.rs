//! Triangle setup and scan conversion.
//!
//! Pixel centers are sampled at `(x + 0.5, y + 0.5)` with y pointing down.
//! Coverage follows the top-left rule, so pixels on an edge shared by two
//! triangles are drawn exactly once. Triangles crossing the near plane are
//! clipped in clip space before the divide.

use glam::{Vec2, Vec4};

/// Clip-space `w` below this is treated as behind the eye.
const MIN_W: f32 = 1e-6;

// ── near clipping ─────────────────────────────────────────────────────────

/// Clip-space vertex of a clipped polygon with its weights over the three
/// corners of the source triangle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ClipVertex {
    pub position: Vec4,
    pub weights: [f32; 3],
}

impl ClipVertex {
    fn corner(i: usize, position: Vec4) -> Self {
        let mut weights = [0.0; 3];
        weights[i] = 1.0;
        Self { position, weights }
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        let mut weights = [0.0; 3];
        for (i, w) in weights.iter_mut().enumerate() {
            *w = self.weights[i] + (other.weights[i] - self.weights[i]) * t;
        }
        Self { position: self.position.lerp(other.position, t), weights }
    }
}

/// Clips a clip-space triangle against the near plane (`z >= 0`) and
/// `w >= MIN_W`.
///
/// Returns a convex polygon in the source winding, starting at corner 0 when
/// it survives. A triangle fully in front comes back unchanged. The far and
/// side planes are left to the depth and viewport tests in [`rasterize`].
pub(crate) fn clip_near(tri: [Vec4; 3]) -> Vec<ClipVertex> {
    let planes: [fn(Vec4) -> f32; 2] = [|p| p.z, |p| p.w - MIN_W];

    let mut polygon: Vec<ClipVertex> = tri.iter().enumerate().map(|(i, &p)| ClipVertex::corner(i, p)).collect();
    for distance in planes {
        if polygon.is_empty() {
            break;
        }
        let mut kept = Vec::with_capacity(polygon.len() + 1);
        for (i, &current) in polygon.iter().enumerate() {
            let next = polygon[(i + 1) % polygon.len()];
            let (dc, dn) = (distance(current.position), distance(next.position));
            if dc >= 0.0 {
                kept.push(current);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                kept.push(current.lerp(next, dc / (dc - dn)));
            }
        }
        polygon = kept;
    }
    polygon
}

/// Maps weights over a triangle of clipped vertices back onto the source
/// corners.
pub(crate) fn corner_weights(fan: &[ClipVertex; 3], weights: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (vertex, w) in fan.iter().zip(weights) {
        for (o, v) in out.iter_mut().zip(vertex.weights) {
            *o += w * v;
        }
    }
    out
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ScreenVertex {
    pub pos: Vec2,
    /// NDC depth.
    pub z: f32,
    pub inv_w: f32,
}

impl ScreenVertex {
    /// Perspective divide and viewport transform. `None` behind the eye.
    pub fn from_clip(clip: Vec4, width: u32, height: u32) -> Option<Self> {
        if clip.w <= 0.0 {
            return None;
        }
        let inv_w = 1.0 / clip.w;
        let ndc = clip.truncate() * inv_w;
        Some(Self {
            pos: Vec2::new(
                (ndc.x * 0.5 + 0.5) * width as f32,
                (0.5 - ndc.y * 0.5) * height as f32,
            ),
            z: ndc.z,
            inv_w,
        })
    }
}

/// A covered pixel with depth and perspective-correct weights.
///
/// `weights[i]` belongs to the i-th vertex as passed to [`rasterize`],
/// regardless of winding.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub weights: [f32; 3],
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top or left edge for a triangle with positive area (y down).
#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

#[inline]
fn covers(w: f32, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}

/// Visits every covered pixel center inside `[0, width) × [0, height)` in
/// scanline order. Both windings are rasterized; zero-area triangles and
/// fragments with depth outside `[0, 1]` are dropped.
pub(crate) fn rasterize(
    tri: [ScreenVertex; 3],
    width: u32,
    height: u32,
    mut emit: impl FnMut(Fragment),
) {
    let area = edge(tri[0].pos, tri[1].pos, tri[2].pos);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    // Walk the triangle with positive area; remember how to map weights back.
    let order: [usize; 3] = if area > 0.0 { [0, 1, 2] } else { [0, 2, 1] };
    let [v0, v1, v2] = order.map(|i| tri[i]);
    let area = area.abs();

    let tl0 = is_top_left(v1.pos, v2.pos);
    let tl1 = is_top_left(v2.pos, v0.pos);
    let tl2 = is_top_left(v0.pos, v1.pos);

    let min = v0.pos.min(v1.pos).min(v2.pos);
    let max = v0.pos.max(v1.pos).max(v2.pos);
    let x_start = (min.x.floor().max(0.0)) as u32;
    let y_start = (min.y.floor().max(0.0)) as u32;
    let x_end = (max.x.ceil().max(0.0) as u32).min(width);
    let y_end = (max.y.ceil().max(0.0) as u32).min(height);

    for y in y_start..y_end {
        for x in x_start..x_end {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(v1.pos, v2.pos, p);
            let w1 = edge(v2.pos, v0.pos, p);
            let w2 = edge(v0.pos, v1.pos, p);
            if !(covers(w0, tl0) && covers(w1, tl1) && covers(w2, tl2)) {
                continue;
            }

            let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
            let depth = l0 * v0.z + l1 * v1.z + l2 * v2.z;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            let q = [l0 * v0.inv_w, l1 * v1.inv_w, l2 * v2.inv_w];
            let sum = q[0] + q[1] + q[2];
            let mut weights = [0.0; 3];
            for (k, &i) in order.iter().enumerate() {
                weights[i] = q[k] / sum;
            }

            emit(Fragment { x, y, depth, weights });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(x: f32, y: f32) -> ScreenVertex {
        ScreenVertex { pos: Vec2::new(x, y), z: 0.5, inv_w: 1.0 }
    }

    fn hits(tri: [ScreenVertex; 3], w: u32, h: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        rasterize(tri, w, h, |f| out.push((f.x, f.y)));
        out
    }

    #[test]
    fn viewport_maps_ndc_corners() {
        let tl = ScreenVertex::from_clip(Vec4::new(-1.0, 1.0, 0.0, 1.0), 8, 4).unwrap();
        let br = ScreenVertex::from_clip(Vec4::new(2.0, -2.0, 1.0, 2.0), 8, 4).unwrap();
        assert_eq!(tl.pos, Vec2::new(0.0, 0.0));
        assert_eq!(br.pos, Vec2::new(8.0, 4.0));
        assert_eq!(br.z, 0.5);
        assert!(ScreenVertex::from_clip(Vec4::new(0.0, 0.0, 0.0, 0.0), 8, 4).is_none());
    }

    #[test]
    fn shared_edge_is_drawn_once() {
        let (a, b, c, d) = (sv(0.0, 0.0), sv(8.0, 0.0), sv(8.0, 8.0), sv(0.0, 8.0));
        let mut count = vec![0u32; 64];
        for tri in [[a, b, c], [a, c, d]] {
            for (x, y) in hits(tri, 8, 8) {
                count[(y * 8 + x) as usize] += 1;
            }
        }
        assert!(count.iter().all(|&n| n == 1), "{count:?}");
    }

    #[test]
    fn winding_does_not_matter() {
        let (a, b, c) = (sv(1.0, 1.0), sv(7.0, 2.0), sv(3.0, 7.0));
        let mut cw = hits([a, b, c], 8, 8);
        let mut ccw = hits([a, c, b], 8, 8);
        cw.sort_unstable();
        ccw.sort_unstable();
        assert!(!cw.is_empty());
        assert_eq!(cw, ccw);
    }

    #[test]
    fn weights_follow_input_order() {
        // Pixel (0, 0) center sits close to the first vertex.
        let tri = [sv(0.0, 0.0), sv(16.0, 0.0), sv(0.0, 16.0)];
        let swapped = [tri[0], tri[2], tri[1]];
        let mut a = None;
        let mut b = None;
        rasterize(tri, 16, 16, |f| if (f.x, f.y) == (0, 0) { a = Some(f.weights) });
        rasterize(swapped, 16, 16, |f| if (f.x, f.y) == (0, 0) { b = Some(f.weights) });
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a[0] > 0.9);
        assert_eq!(a[0], b[0]);
        assert_eq!(a[1], b[2]);
        assert_eq!(a[2], b[1]);
    }

    #[test]
    fn degenerate_and_offscreen_triangles_emit_nothing() {
        assert!(hits([sv(0.0, 0.0), sv(4.0, 4.0), sv(8.0, 8.0)], 8, 8).is_empty());
        assert!(hits([sv(-9.0, -9.0), sv(-1.0, -9.0), sv(-1.0, -1.0)], 8, 8).is_empty());
    }

    #[test]
    fn triangle_in_front_is_not_clipped() {
        let tri = [Vec4::new(-1.0, -1.0, 0.5, 1.0), Vec4::new(1.0, -1.0, 0.0, 1.0), Vec4::new(0.0, 1.0, 1.0, 2.0)];
        let polygon = clip_near(tri);
        assert_eq!(polygon.len(), 3);
        for (i, v) in polygon.iter().enumerate() {
            assert_eq!(v.position, tri[i]);
            assert_eq!(v.weights[i], 1.0);
        }
        assert!(clip_near(tri.map(|p| Vec4::new(p.x, p.y, -1.0, 1.0))).is_empty());
    }

    #[test]
    fn crossing_triangle_becomes_quad_on_near_plane() {
        let tri = [
            Vec4::new(-1.0, -1.0, 0.5, 1.0),
            Vec4::new(1.0, -1.0, 0.5, 1.0),
            Vec4::new(0.0, 3.0, -1.5, -1.0),
        ];
        let polygon = clip_near(tri);
        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon[0].position, tri[0]);
        assert_eq!(polygon[1].position, tri[1]);
        assert_eq!(polygon[2].position, Vec4::new(0.75, 0.0, 0.0, 0.5));
        assert_eq!(polygon[3].position, Vec4::new(-0.75, 0.0, 0.0, 0.5));
        assert_eq!(polygon[2].weights, [0.0, 0.75, 0.25]);
        for v in &polygon {
            assert!(v.position.z >= 0.0 && v.position.w > 0.0);
        }
    }

    #[test]
    fn fan_weights_compose_onto_corners() {
        let polygon = clip_near([
            Vec4::new(-1.0, -1.0, 0.5, 1.0),
            Vec4::new(1.0, -1.0, 0.5, 1.0),
            Vec4::new(0.0, 3.0, -1.5, -1.0),
        ]);
        let fan = [polygon[0], polygon[2], polygon[3]];
        assert_eq!(corner_weights(&fan, [1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]);
        let mid = corner_weights(&fan, [0.0, 0.5, 0.5]);
        assert_eq!(mid, [0.375, 0.375, 0.25]);
    }

    #[test]
    fn depth_outside_unit_range_is_clipped() {
        let far = |x, y| ScreenVertex { pos: Vec2::new(x, y), z: 1.5, inv_w: 1.0 };
        assert!(hits([far(0.0, 0.0), far(8.0, 0.0), far(0.0, 8.0)], 8, 8).is_empty());
    }
}
