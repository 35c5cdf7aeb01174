//! Core types: math re-exports, scene graph, camera, controls and the
//! per-frame session that ties them together. Renderer-agnostic.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, vec2, vec3};

pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod light;
pub mod material;
pub mod pointer;
pub mod scene;
pub mod session;
pub mod transform;
pub mod viewport;

pub use error::{CoreError, CoreResult};
