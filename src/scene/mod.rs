pub mod animation;
pub mod graph;
pub mod material;

pub use animation::{AnimationChannel, AnimationClip, ChannelValues, Interpolation};
pub use graph::{
    AmbientLight, AttachedModel, MeshInstance, Node, NodeId, NodeKind, SceneGraph, SceneSubgraph,
    Transform,
};
pub use material::{Material, MaterialId, MaterialLibrary, TextureSlot};
