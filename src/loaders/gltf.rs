use std::collections::HashMap;
use std::path::Path;

use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::{Interpolation as GltfInterpolation, Property};
use log::{debug, warn};

use crate::error::LoadError;
use crate::math::{Color, AABB};
use crate::scene::{
    AnimationChannel, AnimationClip, ChannelValues, Interpolation, Material, MaterialId, NodeId,
    NodeKind, SceneSubgraph, TextureSlot, Transform,
};

/// Required extensions the decoder cannot handle
const UNSUPPORTED_EXTENSIONS: &[&str] = &["KHR_draco_mesh_compression", "EXT_meshopt_compression"];

/// Decode a `.glb` / `.gltf` file into a detached scene subgraph
pub fn load_gltf_file(path: &Path, url: &str) -> Result<SceneSubgraph, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decode = |source: gltf::Error| LoadError::Decode {
        url: url.to_string(),
        source,
    };

    // parse unvalidated first: validation rejects unknown required extensions
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(&bytes).map_err(decode)?;
    if let Some(extension) = document
        .extensions_required()
        .find(|ext| UNSUPPORTED_EXTENSIONS.contains(ext))
    {
        return Err(LoadError::UnsupportedCompression {
            url: url.to_string(),
            extension: extension.to_string(),
        });
    }

    let document = gltf::Document::from_json(document.into_json()).map_err(decode)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob).map_err(decode)?;

    debug!(
        "glTF {}: {} scenes, {} nodes, {} meshes, {} animations",
        url,
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.animations().count()
    );

    let mut builder = SubgraphBuilder::new(model_name(url));
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in scene.nodes() {
            builder.process_node(&node, None);
        }
    } else {
        warn!("glTF {} has no scene; nothing to attach", url);
    }

    for animation in document.animations() {
        if let Some(clip) = builder.read_animation(&animation, &buffers) {
            builder.subgraph.add_animation(clip);
        }
    }

    Ok(builder.subgraph)
}

/// File stem of a url, used as the model's group name
fn model_name(url: &str) -> String {
    Path::new(url)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(url)
        .to_string()
}

struct SubgraphBuilder {
    subgraph: SceneSubgraph,
    /// glTF material index -> subgraph material, so sharing survives decoding
    materials: HashMap<Option<usize>, MaterialId>,
    /// glTF node index -> subgraph node
    nodes: HashMap<usize, NodeId>,
}

impl SubgraphBuilder {
    fn new(name: String) -> Self {
        Self {
            subgraph: SceneSubgraph::new(name),
            materials: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    /// Recursively processes glTF nodes
    fn process_node(&mut self, node: &gltf::Node, parent: Option<NodeId>) {
        let (translation, rotation, scale) = node.transform().decomposed();
        let transform = Transform {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        };
        let name = node
            .name()
            .map(str::to_string)
            .or_else(|| node.mesh().and_then(|m| m.name().map(str::to_string)))
            .unwrap_or_else(|| format!("node_{}", node.index()));

        let id = match node.mesh() {
            Some(mesh) => self.process_mesh(&mesh, parent, name, transform),
            None => self.subgraph.add_node(parent, name, NodeKind::Group, transform),
        };
        self.nodes.insert(node.index(), id);

        for child in node.children() {
            self.process_node(&child, Some(id));
        }
    }

    /// A single-primitive mesh becomes one mesh node; several primitives
    /// become a group with one mesh child each
    fn process_mesh(
        &mut self,
        mesh: &gltf::Mesh,
        parent: Option<NodeId>,
        name: String,
        transform: Transform,
    ) -> NodeId {
        let primitives: Vec<(AABB, MaterialId)> = mesh
            .primitives()
            .map(|primitive| {
                let bounds = primitive.bounding_box();
                let aabb = AABB::new(Vec3::from_array(bounds.min), Vec3::from_array(bounds.max));
                (aabb, self.material(&primitive.material()))
            })
            .collect();

        match primitives.as_slice() {
            [(bounds, material)] => self.subgraph.add_node(
                parent,
                name,
                NodeKind::Mesh {
                    bounds: *bounds,
                    material: *material,
                },
                transform,
            ),
            _ => {
                let group = self
                    .subgraph
                    .add_node(parent, name.clone(), NodeKind::Group, transform);
                for (index, (bounds, material)) in primitives.iter().enumerate() {
                    self.subgraph.add_node(
                        Some(group),
                        format!("{name}_{index}"),
                        NodeKind::Mesh {
                            bounds: *bounds,
                            material: *material,
                        },
                        Transform::IDENTITY,
                    );
                }
                group
            }
        }
    }

    fn material(&mut self, material: &gltf::Material) -> MaterialId {
        let key = material.index();
        if let Some(id) = self.materials.get(&key) {
            return *id;
        }

        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, a] = pbr.base_color_factor();
        let [er, eg, eb] = material.emissive_factor();
        let mut converted = Material::new(
            material.name().unwrap_or("default"),
            Color::new(r, g, b),
        )
        .with_emissive(Color::new(er, eg, eb))
        .with_opacity(a);
        if pbr.base_color_texture().is_some() {
            converted = converted.with_map(TextureSlot::default());
        }

        let id = self.subgraph.add_material(converted);
        self.materials.insert(key, id);
        id
    }

    fn read_animation(
        &self,
        animation: &gltf::Animation,
        buffers: &[gltf::buffer::Data],
    ) -> Option<AnimationClip> {
        let mut channels = Vec::new();

        for channel in animation.channels() {
            let Some(target) = self.nodes.get(&channel.target().node().index()).copied() else {
                continue;
            };
            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(times) = reader.read_inputs().map(|inputs| inputs.collect::<Vec<f32>>()) else {
                continue;
            };

            let (interpolation, stride) = match channel.sampler().interpolation() {
                GltfInterpolation::Linear => (Interpolation::Linear, 1),
                GltfInterpolation::Step => (Interpolation::Step, 1),
                // in-tangent, value, out-tangent per key; keep the value
                GltfInterpolation::CubicSpline => (Interpolation::Linear, 3),
            };
            let pick = |index: usize| stride == 1 || index % 3 == 1;

            let values = match (channel.target().property(), reader.read_outputs()) {
                (Property::Translation, Some(ReadOutputs::Translations(out))) => ChannelValues::Translation(
                    out.enumerate().filter(|(i, _)| pick(*i)).map(|(_, v)| Vec3::from_array(v)).collect(),
                ),
                (Property::Rotation, Some(ReadOutputs::Rotations(out))) => ChannelValues::Rotation(
                    out.into_f32()
                        .enumerate()
                        .filter(|(i, _)| pick(*i))
                        .map(|(_, q)| Quat::from_array(q))
                        .collect(),
                ),
                (Property::Scale, Some(ReadOutputs::Scales(out))) => ChannelValues::Scale(
                    out.enumerate().filter(|(i, _)| pick(*i)).map(|(_, v)| Vec3::from_array(v)).collect(),
                ),
                _ => continue,
            };

            channels.push(AnimationChannel {
                target,
                times,
                values,
                interpolation,
            });
        }

        if channels.is_empty() {
            return None;
        }
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation_{}", animation.index()));
        Some(AnimationClip::new(name, channels))
    }
}
