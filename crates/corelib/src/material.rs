//! Material selection for model meshes.

use crate::config::{SceneConfig, srgb_hex_to_linear};
use crate::{Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EyeSide {
    Left,
    Right,
}

/// Which shading a mesh node gets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Stepped toon shading with a normal map; the door body.
    #[default]
    Toon,
    /// Unlit, base color texture only.
    Eye(EyeSide),
}

/// Nodes whose name appears here get a dedicated material; every other
/// mesh falls back to [`MaterialKind::Toon`].
const NAMED_MATERIALS: &[(&str, MaterialKind)] = &[
    ("EyeLeft", MaterialKind::Eye(EyeSide::Left)),
    ("EyeRight", MaterialKind::Eye(EyeSide::Right)),
];

pub fn classify(name: &str) -> MaterialKind {
    NAMED_MATERIALS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, kind)| kind)
        .unwrap_or_default()
}

impl MaterialKind {
    #[inline]
    pub fn eye_side(self) -> Option<EyeSide> {
        match self {
            MaterialKind::Eye(side) => Some(side),
            MaterialKind::Toon => None,
        }
    }
}

/// Toon material parameters (textures are bound by the renderer).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToonMaterial {
    /// Linear RGB.
    pub color: Vec3,
    pub normal_scale: Vec2,
}

impl ToonMaterial {
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            color: srgb_hex_to_linear(config.door_color),
            normal_scale: config.door_normal_scale,
        }
    }
}
