//! Orbit controls: pointer drags orbit the camera around a fixed target,
//! with optional inertia damping. Pan and zoom can be switched off, in
//! which case the camera keeps a constant distance to the target.

use std::f32::consts::{PI, TAU};

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::Vec3;

const EPS: f32 = 1e-6;

/// Spherical coordinates with +Y as the polar axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    /// Azimuth around +Y, measured from +Z towards +X.
    pub theta: f32,
}

impl Spherical {
    pub fn from_vec3(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        let sin_phi_r = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_r * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_r * self.theta.cos(),
        )
    }

    /// Keep phi away from the poles so the view basis stays defined.
    pub fn make_safe(mut self) -> Self {
        self.phi = self.phi.clamp(EPS, PI - EPS);
        self
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub rotate_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            enable_pan: true,
            enable_zoom: true,
            enable_rotate: true,
            rotate_speed: 1.0,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta: Spherical::default(),
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            dragging: false,
            last_pointer: None,
        }
    }

    /// Damped orbit-only controls used by the scene.
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            enable_damping: true,
            damping_factor: config.damping_factor,
            enable_pan: false,
            enable_zoom: false,
            rotate_speed: config.rotate_speed,
            ..Self::new(config.orbit_target)
        }
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn on_pointer_down(&mut self, x: f64, y: f64) {
        if !self.enable_rotate {
            return;
        }
        self.dragging = true;
        self.last_pointer = Some((x, y));
    }

    pub fn on_pointer_up(&mut self) {
        self.dragging = false;
        self.last_pointer = None;
    }

    /// Feed the pointer position while a drag is active. `viewport_height`
    /// is in the same units as `x`/`y`.
    pub fn on_pointer_move(&mut self, x: f64, y: f64, viewport_height: f64) {
        if !self.dragging {
            return;
        }
        if let Some((lx, ly)) = self.last_pointer {
            self.on_drag(x - lx, y - ly, viewport_height);
        }
        self.last_pointer = Some((x, y));
    }

    /// Convert a drag delta into orbit angles. A drag over the full
    /// viewport height turns the camera once around.
    pub fn on_drag(&mut self, dx: f64, dy: f64, viewport_height: f64) {
        if !self.enable_rotate || viewport_height <= 0.0 {
            return;
        }
        let h = viewport_height as f32;
        self.rotate_left(TAU * dx as f32 * self.rotate_speed / h);
        self.rotate_up(TAU * dy as f32 * self.rotate_speed / h);
    }

    /// Wheel input; ignored while zoom is disabled.
    pub fn on_scroll(&mut self, delta: f32) {
        if !self.enable_zoom || delta == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(delta.abs());
        if delta > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Screen-space pan; ignored while pan is disabled.
    pub fn pan(&mut self, offset: Vec3) {
        if self.enable_pan {
            self.pan_offset += offset;
        }
    }

    #[inline]
    pub fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    #[inline]
    pub fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    /// Advance the controls by one frame and write the result into the
    /// camera. Call exactly once per rendered frame: damping decays the
    /// pending rotation a little on every call. Returns whether the camera
    /// moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let before = camera.position;
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_vec3(offset);

        if self.enable_damping {
            spherical.theta += self.delta.theta * self.damping_factor;
            spherical.phi += self.delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.delta.theta;
            spherical.phi += self.delta.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        spherical = spherical.make_safe();
        spherical.radius *= self.scale;

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.position = self.target + spherical.to_vec3();
        camera.target = self.target;

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.delta.theta *= decay;
            self.delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        (camera.position - before).length_squared() > EPS
    }
}
