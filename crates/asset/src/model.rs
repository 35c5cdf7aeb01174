//! glTF 2.0 model loader: node hierarchy with names and transforms, plus
//! one merged triangle mesh per referenced glTF mesh.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use corelib::scene::{MeshId, ModelDesc, NodeDesc};
use corelib::transform::Transform;
use glam::{Quat, Vec3};

use crate::mesh::{MeshData, MeshVertex};

/// A loaded model: node hierarchy plus the meshes its nodes reference.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub desc: ModelDesc,
    pub meshes: Vec<MeshData>,
}

/// Load a `.gltf` (external or embedded buffers) or `.glb` file.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelData> {
    let path = path.as_ref();
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
        .with_context(|| format!("Failed to open glTF file: {}", path.display()))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .with_context(|| format!("Failed to load buffers for {}", path.display()))?;
    let model = build_model(&document, &buffers)?;
    log::info!(
        "Loaded model {} ({} nodes, {} meshes)",
        path.display(),
        model.desc.nodes.len(),
        model.meshes.len()
    );
    Ok(model)
}

/// Node names as the scene sees them: whitespace becomes `_`, and the
/// characters `[ ] . : /` are dropped.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | '.' | ':' | '/'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Hands out node names, suffixing repeats as `name_1`, `name_2`, ...
#[derive(Default)]
struct UniqueNames {
    used: HashMap<String, u32>,
}

impl UniqueNames {
    fn claim(&mut self, name: String) -> String {
        if name.is_empty() {
            return name;
        }
        match self.used.get_mut(&name) {
            Some(count) => {
                *count += 1;
                format!("{name}_{count}")
            }
            None => {
                self.used.insert(name.clone(), 0);
                name
            }
        }
    }
}

fn build_model(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<ModelData> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| anyhow!("glTF contains no scenes"))?;

    let mut builder = Builder {
        buffers,
        model: ModelData::default(),
        mesh_ids: HashMap::new(),
        names: UniqueNames::default(),
    };
    for node in scene.nodes() {
        builder.visit(&node, None)?;
    }
    Ok(builder.model)
}

struct Builder<'a> {
    buffers: &'a [gltf::buffer::Data],
    model: ModelData,
    /// glTF mesh index -> our mesh id; `None` for meshes with no triangles.
    mesh_ids: HashMap<usize, Option<MeshId>>,
    names: UniqueNames,
}

impl Builder<'_> {
    fn visit(&mut self, node: &gltf::Node<'_>, parent: Option<usize>) -> Result<()> {
        let (t, r, s) = node.transform().decomposed();
        let transform = Transform::from_trs(Vec3::from(t), Quat::from_array(r), Vec3::from(s));

        let mesh = match node.mesh() {
            Some(m) => self.mesh_id(&m)?,
            None => None,
        };
        let name = node
            .name()
            .or_else(|| node.mesh().and_then(|m| m.name()))
            .map(sanitize_name)
            .unwrap_or_default();
        let name = self.names.claim(name);

        let index = self.model.desc.nodes.len();
        self.model.desc.nodes.push(NodeDesc {
            name,
            parent,
            transform,
            mesh,
        });

        for child in node.children() {
            self.visit(&child, Some(index))?;
        }
        Ok(())
    }

    fn mesh_id(&mut self, mesh: &gltf::Mesh<'_>) -> Result<Option<MeshId>> {
        if let Some(id) = self.mesh_ids.get(&mesh.index()) {
            return Ok(*id);
        }
        let data = read_mesh(mesh, self.buffers)?;
        let id = if data.is_valid() {
            let id = self.model.meshes.len() as MeshId;
            self.model.meshes.push(data);
            Some(id)
        } else {
            log::warn!(
                "glTF mesh {:?} has no triangle primitives; skipped",
                mesh.name().unwrap_or("<unnamed>")
            );
            None
        };
        self.mesh_ids.insert(mesh.index(), id);
        Ok(id)
    }
}

fn read_mesh(mesh: &gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let mut out = MeshData::default();
    for prim in mesh.primitives() {
        if prim.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping non-triangle primitive ({:?})", prim.mode());
            continue;
        }
        let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
        let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
        let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|t| t.collect());

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            anyhow::bail!(
                "glTF index {} out of bounds (vertex count {})",
                bad,
                positions.len()
            );
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| MeshVertex {
                position: p,
                normal: normals
                    .as_ref()
                    .and_then(|n| n.get(i).copied())
                    .unwrap_or([0.0, 0.0, 1.0]),
                uv: uvs.as_ref().and_then(|t| t.get(i).copied()).unwrap_or([0.0, 0.0]),
                tangent: tangents
                    .as_ref()
                    .and_then(|t| t.get(i).copied())
                    .unwrap_or([1.0, 0.0, 0.0, 1.0]),
            })
            .collect();

        let mut part = MeshData::new(vertices, indices);
        if normals.is_none() {
            part.compute_normals();
        }
        if tangents.is_none() {
            part.generate_tangents();
        }
        out.append(part);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::material::{EyeSide, MaterialKind, classify};

    fn triangle_bin() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        positions.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    const DOOR_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [
            { "name": "Door", "mesh": 0, "children": [1, 2, 3] },
            { "name": "EyeLeft", "mesh": 0, "translation": [-0.3, 2.0, 0.1] },
            { "name": "EyeRight", "mesh": 0, "translation": [0.3, 2.0, 0.1] },
            { "mesh": 1 }
        ],
        "meshes": [
            { "name": "Tri", "primitives": [ { "attributes": { "POSITION": 0 } } ] },
            { "name": "Hinge", "primitives": [ { "attributes": { "POSITION": 0 } } ] }
        ],
        "buffers": [ { "uri": "tri.bin", "byteLength": 36 } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
        "accessors": [ {
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
        } ]
    }"#;

    fn write_door(dir: &Path) -> std::path::PathBuf {
        std::fs::write(dir.join("tri.bin"), triangle_bin()).unwrap();
        let path = dir.join("Door.gltf");
        std::fs::write(&path, DOOR_GLTF).unwrap();
        path
    }

    #[test]
    fn loads_hierarchy_names_and_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_model(write_door(dir.path())).unwrap();

        let names: Vec<_> = model.desc.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Door", "EyeLeft", "EyeRight", "Hinge"]);
        assert_eq!(model.desc.nodes[0].parent, None);
        assert!(model.desc.nodes[1..].iter().all(|n| n.parent == Some(0)));
        assert_eq!(
            model.desc.nodes[1].transform.translation,
            Vec3::new(-0.3, 2.0, 0.1)
        );

        // Shared glTF mesh is loaded once.
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.desc.nodes[0].mesh, model.desc.nodes[2].mesh);
        assert!(model.desc.nodes.iter().all(|n| n.mesh.is_some()));

        let kinds: Vec<_> = model.desc.nodes.iter().map(|n| classify(&n.name)).collect();
        assert!(matches!(kinds[1], MaterialKind::Eye(_)));
        assert!(matches!(kinds[2], MaterialKind::Eye(_)));
        assert_eq!(kinds[3], MaterialKind::Toon);
    }

    #[test]
    fn missing_attributes_are_derived() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_model(write_door(dir.path())).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Z).length() < 1e-5);
            let t = Vec3::new(v.tangent[0], v.tangent[1], v.tangent[2]);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn repeated_names_get_suffixes_and_lose_eye_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_door(dir.path());
        let twin_eyes = DOOR_GLTF.replace(r#""name": "EyeRight""#, r#""name": "EyeLeft""#);
        std::fs::write(&path, twin_eyes).unwrap();

        let model = load_model(&path).unwrap();
        let names: Vec<_> = model.desc.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Door", "EyeLeft", "EyeLeft_1", "Hinge"]);
        assert_eq!(classify(names[1]), MaterialKind::Eye(EyeSide::Left));
        assert_eq!(classify(names[2]), MaterialKind::Toon);
    }

    #[test]
    fn unique_names_count_per_name() {
        let mut names = UniqueNames::default();
        let got: Vec<_> = ["a", "b", "a", "", "a", ""]
            .into_iter()
            .map(|n| names.claim(n.to_owned()))
            .collect();
        assert_eq!(got, ["a", "b", "a_1", "", "a_2", ""]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_model("no/such/Door02.gltf").unwrap_err();
        assert!(format!("{err:#}").contains("Door02.gltf"));
    }

    #[test]
    fn missing_buffer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Door.gltf");
        std::fs::write(&path, DOOR_GLTF).unwrap();
        assert!(load_model(&path).is_err());
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize_name("Eye Right"), "Eye_Right");
        assert_eq!(sanitize_name("Door.001"), "Door001");
        assert_eq!(sanitize_name("a:b/c[d]"), "abcd");
        assert_eq!(sanitize_name("EyeLeft"), "EyeLeft");
    }
}
