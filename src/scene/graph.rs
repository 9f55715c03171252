use glam::{Mat4, Quat, Vec3};
use log::debug;

use super::animation::AnimationClip;
use super::material::{Material, MaterialId, MaterialLibrary};
use crate::math::{Color, AABB};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Translation, rotation and scale relative to the parent node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    /// Renderable geometry, summarised by its local-space bounds
    Mesh { bounds: AABB, material: MaterialId },
    Light(AmbientLight),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind, transform: Transform, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            kind,
            transform,
            visible: true,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn material(&self) -> Option<MaterialId> {
        match self.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            _ => None,
        }
    }
}

/// A visible mesh resolved into world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub node: NodeId,
    pub bounds: AABB,
    pub material: MaterialId,
}

/// A decoded model that has not been attached to a scene yet
///
/// Node and material ids are local to the subgraph. Attaching consumes it,
/// so a loaded model can live in at most one scene.
#[derive(Debug, Clone, Default)]
pub struct SceneSubgraph {
    pub name: String,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    materials: Vec<Material>,
    animations: Vec<AnimationClip>,
}

impl SceneSubgraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId::from_index(self.materials.len() - 1)
    }

    /// Add a node under `parent`, or as a root when `parent` is `None`
    ///
    /// Unknown parents make the node a root.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        kind: NodeKind,
        transform: Transform,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|p| p.0 < self.nodes.len());
        self.nodes.push(Node::new(name, kind, transform, parent));
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn add_animation(&mut self, clip: AnimationClip) {
        self.animations.push(clip);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn animations(&self) -> &[AnimationClip] {
        &self.animations
    }

    pub fn find_by_name(&self, pattern: &str) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.nodes[id.0].name.contains(pattern))
            .collect()
    }
}

/// Handles into the scene for a model that was just attached
#[derive(Debug, Clone)]
pub struct AttachedModel {
    pub name: String,
    /// Group node holding the model's roots
    pub root: NodeId,
    /// Scene id of every subgraph node, indexed by its local id
    pub nodes: Vec<NodeId>,
    /// Clips with their targets rewritten to scene ids
    pub animations: Vec<AnimationClip>,
}

impl AttachedModel {
    pub fn scene_id(&self, local: NodeId) -> Option<NodeId> {
        self.nodes.get(local.0).copied()
    }
}

/// The single tree of renderable nodes owned by a viewport
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    pub materials: MaterialLibrary,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("Scene", NodeKind::Group, Transform::IDENTITY, None)],
            materials: MaterialLibrary::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Add a node under `parent`; an unknown parent falls back to the root
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        transform: Transform,
    ) -> NodeId {
        let parent = if parent.0 < self.nodes.len() { parent } else { self.root() };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, kind, transform, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Move a loaded model into the scene under `parent`
    pub fn attach(&mut self, parent: NodeId, subgraph: SceneSubgraph) -> AttachedModel {
        let SceneSubgraph {
            name,
            nodes,
            roots: _,
            materials,
            animations,
        } = subgraph;

        let material_map: Vec<MaterialId> = materials
            .into_iter()
            .map(|material| self.materials.add(material))
            .collect();

        let root = self.add_node(parent, name.clone(), NodeKind::Group, Transform::IDENTITY);
        let mut node_map = Vec::with_capacity(nodes.len());
        for node in nodes {
            // parents always precede their children in a subgraph
            let scene_parent = node.parent.and_then(|p| node_map.get(p.0).copied()).unwrap_or(root);
            let kind = match node.kind {
                NodeKind::Mesh { bounds, material } => NodeKind::Mesh {
                    bounds,
                    material: material_map
                        .get(material.index())
                        .copied()
                        .unwrap_or(material),
                },
                other => other,
            };
            let id = self.add_node(scene_parent, node.name, kind, node.transform);
            if let Some(scene_node) = self.node_mut(id) {
                scene_node.visible = node.visible;
            }
            node_map.push(id);
        }

        let animations = animations
            .into_iter()
            .map(|mut clip| {
                clip.channels
                    .retain_mut(|channel| channel.remap(|local| node_map.get(local.0).copied()));
                clip
            })
            .collect();

        debug!("Attached model '{}' ({} nodes)", name, node_map.len());
        AttachedModel {
            name,
            root,
            nodes: node_map,
            animations,
        }
    }

    /// Pre-order walk of the subtree at `start`
    pub fn traverse(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.node(start).is_none() {
            return order;
        }
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Nodes whose name contains `pattern`, in pre-order
    pub fn find_by_name(&self, pattern: &str) -> Vec<NodeId> {
        self.traverse(self.root())
            .into_iter()
            .filter(|id| self.nodes[id.0].name.contains(pattern))
            .collect()
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = self.node(id);
        while let Some(node) = cursor {
            matrix = node.transform.matrix() * matrix;
            cursor = node.parent.and_then(|p| self.node(p));
        }
        matrix
    }

    /// True when the node and all of its ancestors are visible
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cursor = self.node(id);
        while let Some(node) = cursor {
            if !node.visible {
                return false;
            }
            cursor = node.parent.and_then(|p| self.node(p));
        }
        true
    }

    /// World-space bounds of every mesh in the subtree at `id`
    pub fn world_bounds(&self, id: NodeId) -> AABB {
        self.collect_meshes(id, false)
            .iter()
            .fold(AABB::EMPTY, |acc, mesh| acc.union(&mesh.bounds))
    }

    /// Mesh nodes in the subtree at `id`, including hidden ones
    pub fn meshes_under(&self, id: NodeId) -> Vec<NodeId> {
        self.collect_meshes(id, false).into_iter().map(|m| m.node).collect()
    }

    /// Every visible mesh with its world-space bounds
    pub fn mesh_instances(&self) -> Vec<MeshInstance> {
        self.collect_meshes(self.root(), true)
    }

    /// Point a mesh at another material, returning the previous one
    pub fn set_material(&mut self, id: NodeId, material: MaterialId) -> Option<MaterialId> {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Mesh { material: slot, .. }) => Some(std::mem::replace(slot, material)),
            _ => None,
        }
    }

    /// Sum of ambient light in the scene
    pub fn ambient_light(&self) -> Color {
        self.nodes
            .iter()
            .filter_map(|node| match node.kind {
                NodeKind::Light(light) => Some(light.color.scale(light.intensity)),
                _ => None,
            })
            .fold(Color::BLACK, Color::add)
    }

    fn collect_meshes(&self, start: NodeId, visible_only: bool) -> Vec<MeshInstance> {
        let mut meshes = Vec::new();
        let Some(node) = self.node(start) else {
            return meshes;
        };
        if visible_only && !self.is_visible(start) {
            return meshes;
        }

        let parent_matrix = node
            .parent
            .map(|p| self.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);
        let mut stack = vec![(start, parent_matrix)];
        while let Some((id, parent_matrix)) = stack.pop() {
            let node = &self.nodes[id.0];
            if visible_only && !node.visible {
                continue;
            }
            let matrix = parent_matrix * node.transform.matrix();
            if let NodeKind::Mesh { bounds, material } = node.kind {
                meshes.push(MeshInstance {
                    node: id,
                    bounds: bounds.transformed(&matrix),
                    material,
                });
            }
            stack.extend(node.children.iter().rev().map(|child| (*child, matrix)));
        }
        meshes
    }
}
