//! Navigation transform and viewing camera
//!
//! The navigation transform maps graph coordinates into physical (display)
//! coordinates. The camera looks at physical space and turns screen positions
//! into rays for picking.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Similarity transform from graph space into physical space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for NavTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl NavTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    /// Transform that shows a graph-space sphere filling `display_radius`
    pub fn fit_sphere(center: Vec3, radius: f32, display_radius: f32) -> Self {
        let scale = if radius > f32::EPSILON {
            display_radius / radius
        } else {
            1.0
        };
        Self {
            translation: -center * scale,
            rotation: Quat::IDENTITY,
            scale,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (point * self.scale)
    }

    /// Physical point back into graph space
    pub fn inverse_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation) / self.scale
    }

    /// Physical direction back into graph space, unnormalized
    pub fn inverse_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.inverse() * vector / self.scale
    }

    /// Rotation that undoes the navigation rotation; faces quads to the viewer
    pub fn inverse_rotation(&self) -> Quat {
        self.rotation.inverse()
    }

    /// Rotate the graph about the physical origin
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = (rotation * self.rotation).normalize();
        self.translation = rotation * self.translation;
    }

    /// Scale the graph about the physical origin
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 && factor.is_finite() {
            self.scale *= factor;
            self.translation *= factor;
        }
    }
}

/// Perspective camera over physical space
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 50.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

impl Camera3D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        proj * view
    }

    /// Ray from the camera through a screen position (normalized 0-1)
    pub fn screen_to_ray(&self, screen_x: f32, screen_y: f32) -> (Vec3, Vec3) {
        // Screen space (0,1) to NDC (-1,1), Y flipped
        let ndc_x = screen_x * 2.0 - 1.0;
        let ndc_y = 1.0 - screen_y * 2.0;

        let inv_view_proj = self.build_view_projection_matrix().inverse();
        // glam's perspective_rh maps depth to [0, 1]
        let near_point = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far_point = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        (near_point, (far_point - near_point).normalize_or_zero())
    }
}
