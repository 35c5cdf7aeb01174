//! GPU-side vertex and uniform layouts (16-byte aligned, `Pod`).

use asset::mesh::MeshVertex;
use bytemuck::{Pod, Zeroable};
use corelib::material::ToonMaterial;
use corelib::session::Frame;
use glam::{Mat3, Mat4};
use wgpu::{VertexBufferLayout, VertexStepMode};

/// Vertex: position + normal + uv + tangent.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x4
        ],
    };
}

impl From<&MeshVertex> for Vertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            pos: v.position,
            normal: v.normal,
            uv: v.uv,
            tangent: v.tangent,
        }
    }
}

/// Camera + light, shared by every draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_radiance: [f32; 4],
}

impl GlobalsUniform {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            camera_pos: frame.camera_position.extend(1.0).to_array(),
            light_dir: frame.light_dir.extend(0.0).to_array(),
            light_radiance: frame.light_radiance.extend(1.0).to_array(),
        }
    }
}

impl Default for GlobalsUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 4],
            light_dir: [0.0, 1.0, 0.0, 0.0],
            light_radiance: [0.0; 4],
        }
    }
}

/// Per-node transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the model's upper 3x3, padded to 4x4.
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4) -> Self {
        let m3 = Mat3::from_mat4(model);
        let normal = if m3.determinant().abs() > f32::EPSILON {
            m3.inverse().transpose()
        } else {
            m3
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: Mat4::from_mat3(normal).to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ToonUniform {
    pub color: [f32; 4],
    pub normal_scale: [f32; 4],
}

impl From<&ToonMaterial> for ToonUniform {
    fn from(m: &ToonMaterial) -> Self {
        Self {
            color: m.color.extend(1.0).to_array(),
            normal_scale: [m.normal_scale.x, m.normal_scale.y, 0.0, 0.0],
        }
    }
}
