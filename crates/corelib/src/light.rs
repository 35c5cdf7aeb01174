use std::f32::consts::TAU;

use crate::config::{SceneConfig, srgb_hex_to_linear};
use crate::{Quat, Vec3};

/// Directional light. Shines from `position` towards the origin; `yaw`
/// swings that position around the Y axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    /// Radians, kept in `[0, 2π)`.
    pub yaw: f32,
}

impl DirectionalLight {
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            color: srgb_hex_to_linear(config.light_color),
            intensity: config.light_intensity,
            position: config.light_position,
            yaw: 0.0,
        }
    }

    /// Advance the yaw by `speed * dt` radians.
    pub fn advance_yaw(&mut self, speed: f32, dt: f32) {
        self.yaw = (self.yaw + speed * dt).rem_euclid(TAU);
    }

    pub fn world_position(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * self.position
    }

    /// Unit vector from the lit surface towards the light.
    pub fn to_light(&self) -> Vec3 {
        self.world_position().normalize_or(Vec3::Y)
    }

    /// Color premultiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}
