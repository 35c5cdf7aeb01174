//! CPU-side mesh representation used by loaders.

use glam::{Vec2, Vec3};

/// Vertex with position/normal/uv/tangent. Values are in object space.
/// `tangent.w` holds the bitangent sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Default for MeshVertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            uv: [0.0; 2],
            tangent: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            ..Self::default()
        }
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Append another mesh, rebasing its indices.
    pub fn append(&mut self, other: MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Smooth per-vertex normals from area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let n = self.vertices.len();
        let mut acc = vec![Vec3::ZERO; n];
        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= n || i1 >= n || i2 >= n {
                continue;
            }
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face = (p1 - p0).cross(p2 - p0);
            for i in [i0, i1, i2] {
                acc[i] += face;
            }
        }
        for (v, a) in self.vertices.iter_mut().zip(acc) {
            v.normal = a.normalize_or(Vec3::Z).to_array();
        }
    }

    /// Derive per-vertex tangents from the UV layout.
    ///
    /// Triangle tangents are accumulated per vertex, then orthogonalized
    /// against the normal. Vertices without usable UV gradients get an
    /// arbitrary tangent perpendicular to the normal.
    pub fn generate_tangents(&mut self) {
        let n = self.vertices.len();
        let mut tan = vec![Vec3::ZERO; n];
        let mut bitan = vec![Vec3::ZERO; n];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= n || i1 >= n || i2 >= n {
                continue;
            }
            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);
            let p0 = Vec3::from(v0.position);
            let e1 = Vec3::from(v1.position) - p0;
            let e2 = Vec3::from(v2.position) - p0;
            let uv0 = Vec2::from(v0.uv);
            let d1 = Vec2::from(v1.uv) - uv0;
            let d2 = Vec2::from(v2.uv) - uv0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let b = (e2 * d1.x - e1 * d2.x) * r;
            for i in [i0, i1, i2] {
                tan[i] += t;
                bitan[i] += b;
            }
        }

        for (i, v) in self.vertices.iter_mut().enumerate() {
            let normal = Vec3::from(v.normal).normalize_or(Vec3::Z);
            let t = tan[i] - normal * normal.dot(tan[i]);
            let t = if t.length_squared() > 1e-12 {
                t.normalize()
            } else {
                normal.any_orthonormal_vector()
            };
            let w = if normal.cross(t).dot(bitan[i]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            v.tangent = [t.x, t.y, t.z, w];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        MeshData::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                MeshVertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                MeshVertex::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
                MeshVertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn tangents_follow_u_direction() {
        let mut m = quad();
        m.generate_tangents();
        for v in &m.vertices {
            assert!((v.tangent[0] - 1.0).abs() < 1e-5, "{:?}", v.tangent);
            assert!(v.tangent[1].abs() < 1e-5);
            assert_eq!(v.tangent[3], 1.0);
        }
    }

    #[test]
    fn mirrored_uvs_flip_handedness() {
        let mut m = quad();
        for v in &mut m.vertices {
            v.uv[1] = 1.0 - v.uv[1];
        }
        m.generate_tangents();
        assert!(m.vertices.iter().all(|v| v.tangent[3] == -1.0));
    }

    #[test]
    fn degenerate_uvs_still_give_unit_tangents() {
        let mut m = quad();
        for v in &mut m.vertices {
            v.uv = [0.0, 0.0];
        }
        m.generate_tangents();
        for v in &m.vertices {
            let t = Vec3::new(v.tangent[0], v.tangent[1], v.tangent[2]);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vec3::Z).abs() < 1e-5);
        }
    }

    #[test]
    fn computed_normals_face_winding() {
        let mut m = quad();
        for v in &mut m.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }
        m.compute_normals();
        assert!(m.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = quad();
        a.append(quad());
        assert_eq!(a.vertices.len(), 8);
        assert_eq!(&a.indices[6..], &[4, 5, 6, 4, 6, 7]);
    }
}
