//! Small scene graph: a flat node list with parent links, plus the light.

use crate::error::{CoreError, CoreResult};
use crate::light::DirectionalLight;
use crate::material::{MaterialKind, classify};
use crate::transform::{Transform, look_rotation};
use crate::{Mat4, Vec3};

/// Node id (dense, index into the node list).
pub type NodeId = u32;

/// Index into the mesh list of the model that produced the node.
pub type MeshId = u32;

/// A node as produced by a model loader, before it joins the scene.
/// `parent` indexes an earlier entry of the same list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeDesc {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
}

/// Node hierarchy of a loaded model, parents before children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelDesc {
    pub nodes: Vec<NodeDesc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    /// Set for mesh nodes only.
    pub material: Option<MaterialKind>,
}

impl Node {
    pub fn group(name: impl Into<String>, parent: Option<NodeId>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            transform,
            mesh: None,
            material: None,
        }
    }
}

/// One mesh to draw this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub material: MaterialKind,
    pub world: Mat4,
}

pub struct Scene {
    nodes: Vec<Node>,
    pub light: DirectionalLight,
}

impl Scene {
    pub fn new(light: DirectionalLight) -> Self {
        Self {
            nodes: Vec::new(),
            light,
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id as usize)
    }

    /// Insert a loaded model under a new group node placed at `offset`.
    /// Every mesh node is classified by name; returns the group id and the
    /// ids of the inserted nodes in input order.
    pub fn insert_model(
        &mut self,
        name: &str,
        offset: Vec3,
        model: &ModelDesc,
    ) -> CoreResult<(NodeId, Vec<NodeId>)> {
        for (i, desc) in model.nodes.iter().enumerate() {
            if let Some(p) = desc.parent {
                if p >= i {
                    return Err(CoreError::DanglingParent { node: i, parent: p });
                }
            }
        }

        let root = self.add_node(Node::group(name, None, Transform::from_translation(offset)));
        let mut ids = Vec::with_capacity(model.nodes.len());
        for desc in &model.nodes {
            let parent = match desc.parent {
                Some(p) => ids[p],
                None => root,
            };
            let id = self.add_node(Node {
                name: desc.name.clone(),
                parent: Some(parent),
                transform: desc.transform,
                mesh: desc.mesh,
                material: desc.mesh.map(|_| classify(&desc.name)),
            });
            ids.push(id);
        }
        Ok((root, ids))
    }

    /// World matrix: parent chain multiplied down to the node.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cur = self.node(id);
        while let Some(node) = cur {
            m = node.transform.matrix() * m;
            cur = node.parent.and_then(|p| self.node(p));
        }
        m
    }

    /// Rotate a node so its local +Z axis points at `target` (world space).
    /// The node keeps its position and scale.
    pub fn look_at(&mut self, id: NodeId, target: Vec3) -> CoreResult<()> {
        let node = self.node(id).ok_or(CoreError::UnknownNode(id))?;
        let parent_world = node
            .parent
            .map(|p| self.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);
        let position = (parent_world * node.transform.matrix()).w_axis.truncate();

        let world_rot = look_rotation(target - position, Vec3::Y);
        let (_, parent_rot, _) = parent_world.to_scale_rotation_translation();
        let local = (parent_rot.inverse() * world_rot).normalize();

        if let Some(node) = self.node_mut(id) {
            node.transform.rotation = local;
        }
        Ok(())
    }

    /// Mesh nodes with their world matrices, in insertion order.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| {
                let mesh = n.mesh?;
                Some(DrawItem {
                    node: i as NodeId,
                    mesh,
                    material: n.material.unwrap_or_default(),
                    world: self.world_matrix(i as NodeId),
                })
            })
            .collect()
    }
}
