//! Fly camera producing the per-frame projection constant.

use glam::{Mat3, Mat4, Vec3};

use crate::records::ProjectionConstant;

/// Right-handed perspective camera (view along -Z, +Y up by default).
///
/// Depth maps to `[0, 1]`: the near plane lands on 0, the far plane on 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    view_direction: Vec3,
    up_direction: Vec3,

    fovy: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            view_direction: Vec3::NEG_Z,
            up_direction: Vec3::Y,
            fovy: std::f32::consts::FRAC_PI_3,
            aspect: 800.0 / 600.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        Self {
            position,
            aspect: aspect.max(f32::EPSILON),
            ..Self::default()
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn view_direction(&self) -> Vec3 {
        self.view_direction
    }

    #[inline]
    pub fn up_direction(&self) -> Vec3 {
        self.up_direction
    }

    #[inline]
    pub fn right_direction(&self) -> Vec3 {
        self.view_direction.cross(self.up_direction).normalize()
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(f32::EPSILON);
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        debug_assert!(0.0 < near && near < far);
        self.near = near;
        self.far = far;
    }

    pub fn move_forward(&mut self, distance: f32) {
        self.position += distance * self.view_direction;
    }

    pub fn move_backward(&mut self, distance: f32) {
        self.move_forward(-distance);
    }

    /// Yaw about the camera's own up axis.
    pub fn turn_right(&mut self, angle: f32) {
        let rotation = Mat3::from_axis_angle(-self.up_direction, angle);
        self.view_direction = (rotation * self.view_direction).normalize();
    }

    pub fn turn_left(&mut self, angle: f32) {
        self.turn_right(-angle);
    }

    /// Pitch about the camera's right axis; up follows the view.
    pub fn turn_up(&mut self, angle: f32) {
        let rotation = Mat3::from_axis_angle(self.right_direction(), angle);
        self.view_direction = (rotation * self.view_direction).normalize();
        self.up_direction = (rotation * self.up_direction).normalize();
    }

    pub fn turn_down(&mut self, angle: f32) {
        self.turn_up(-angle);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.view_direction, self.up_direction)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.near, self.far)
    }

    /// `projection * view`, ready to upload.
    pub fn view_projection(&self) -> ProjectionConstant {
        ProjectionConstant::new(self.projection_matrix() * self.view_matrix())
    }
}
