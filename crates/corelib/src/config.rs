//! Scene tunables. Every value has a compile-time default; the binary may
//! override a few of them from the command line.

use std::path::PathBuf;

use crate::{Vec2, Vec3, vec2, vec3};

/// Window title, kept from the canvas element the scene was designed for.
pub const CANVAS_ID: &str = "experience-canvas";

pub const FOV_Y_DEG: f32 = 90.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;
pub const CAMERA_START: Vec3 = vec3(0.0, -0.7, 3.0);
pub const ORBIT_TARGET: Vec3 = Vec3::ZERO;

pub const DAMPING_FACTOR: f32 = 0.05;
pub const ROTATE_SPEED: f32 = 1.0;

/// Device pixel ratios above this are clamped to bound fill cost.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

pub const MODEL_OFFSET_Y: f32 = -2.0;

pub const EYE_TARGET_SCALE: f32 = 2.0;
pub const EYE_TARGET_DEPTH: f32 = 1.8;

pub const LIGHT_COLOR: u32 = 0xe6eee0;
pub const LIGHT_INTENSITY: f32 = 15.0;
pub const LIGHT_POSITION: Vec3 = vec3(1.0, 2.0, 0.1);
/// Radians per second.
pub const LIGHT_YAW_SPEED: f32 = 0.5;

pub const DOOR_COLOR: u32 = 0x7c67e6;
pub const DOOR_NORMAL_SCALE: Vec2 = vec2(1.0, 1.0);

pub const MODEL_FILE: &str = "Door02.gltf";
pub const GRADIENT_RAMP_FILE: &str = "threeTone.jpg";
pub const DOOR_NORMALS_FILE: &str = "noise_Normals_c.png";
pub const EYE_COLOR_FILE: &str = "Eyes_mat_baseColor.jpg";
pub const EYE_NORMALS_FILE: &str = "Eyes_mat_normal.png";

pub const DEFAULT_MSAA_SAMPLES: u32 = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub camera_start: Vec3,
    pub orbit_target: Vec3,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub max_pixel_ratio: f64,
    pub model_offset_y: f32,
    pub eye_target_scale: f32,
    pub eye_target_depth: f32,
    pub light_color: u32,
    pub light_intensity: f32,
    pub light_position: Vec3,
    pub light_yaw_speed: f32,
    pub door_color: u32,
    pub door_normal_scale: Vec2,
    pub assets_dir: PathBuf,
    pub model_file: String,
    pub msaa_samples: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: FOV_Y_DEG,
            z_near: Z_NEAR,
            z_far: Z_FAR,
            camera_start: CAMERA_START,
            orbit_target: ORBIT_TARGET,
            damping_factor: DAMPING_FACTOR,
            rotate_speed: ROTATE_SPEED,
            max_pixel_ratio: MAX_PIXEL_RATIO,
            model_offset_y: MODEL_OFFSET_Y,
            eye_target_scale: EYE_TARGET_SCALE,
            eye_target_depth: EYE_TARGET_DEPTH,
            light_color: LIGHT_COLOR,
            light_intensity: LIGHT_INTENSITY,
            light_position: LIGHT_POSITION,
            light_yaw_speed: LIGHT_YAW_SPEED,
            door_color: DOOR_COLOR,
            door_normal_scale: DOOR_NORMAL_SCALE,
            assets_dir: PathBuf::from("assets"),
            model_file: MODEL_FILE.to_owned(),
            msaa_samples: DEFAULT_MSAA_SAMPLES,
        }
    }
}

impl SceneConfig {
    pub fn model_path(&self) -> PathBuf {
        self.assets_dir.join(&self.model_file)
    }

    pub fn asset_path(&self, file: &str) -> PathBuf {
        self.assets_dir.join(file)
    }
}

/// Convert a `0xRRGGBB` sRGB color into linear RGB.
pub fn srgb_hex_to_linear(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    vec3(channel(16), channel(8), channel(0))
}
