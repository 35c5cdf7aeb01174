use crate::{Mat3, Mat4, Quat, Vec3};

/// Rigid transform with uniform or non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation whose local +Z axis points along `forward`, with `up` as the
/// reference for the local +Y axis.
///
/// A zero `forward` keeps +Z. When `forward` is parallel to `up` the basis
/// is nudged so the result stays a valid rotation.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let mut z = forward;
    if z.length_squared() == 0.0 {
        z = Vec3::Z;
    }
    z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z = z.normalize();
        x = up.cross(z);
    }
    x = x.normalize();
    let y = z.cross(x);

    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-3
    }

    #[test]
    fn look_rotation_along_z_is_identity() {
        let q = look_rotation(Vec3::Z, Vec3::Y);
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn look_rotation_points_forward_axis() {
        let dir = vec3(1.0, 2.0, 3.0).normalize();
        let q = look_rotation(dir, Vec3::Y);
        assert!(approx(q * Vec3::Z, dir));
        // Right axis stays horizontal.
        assert!((q * Vec3::X).y.abs() < 1e-5);
    }

    #[test]
    fn look_rotation_handles_degenerate_input() {
        let zero = look_rotation(Vec3::ZERO, Vec3::Y);
        assert!(approx(zero * Vec3::Z, Vec3::Z));

        let straight_up = look_rotation(Vec3::Y, Vec3::Y);
        assert!(straight_up.is_finite());
        assert!(approx(straight_up * Vec3::Z, Vec3::Y));
    }
}
