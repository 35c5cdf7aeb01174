//! Perspective camera looking at an orbit target, +Y up.

use crate::config::SceneConfig;
use crate::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// World-space position; moved by the orbit controls.
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn from_config(config: &SceneConfig, aspect: f32) -> Self {
        Self {
            position: config.camera_start,
            target: config.orbit_target,
            fov_y: config.fov_y_deg.to_radians(),
            near: config.z_near,
            far: config.z_far,
            aspect,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Depth maps to [0, 1] for wgpu.
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect.max(1e-6), self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Keeps the projection in step with the viewport.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}
