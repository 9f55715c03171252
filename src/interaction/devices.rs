use crate::scene::{NodeId, SceneGraph};

/// One pickable piece of equipment
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub node: NodeId,
    pub name: String,
}

/// Pickable equipment of the device model, fixed once the model is attached
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every direct child of `model_root` is one device
    pub fn from_model(scene: &SceneGraph, model_root: NodeId) -> Self {
        let devices = scene
            .node(model_root)
            .map(|root| root.children())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| {
                scene.node(*id).map(|node| Device {
                    node: *id,
                    name: node.name.clone(),
                })
            })
            .collect();
        Self { devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Index of the device owning `node`, found by walking up its ancestors
    pub fn device_of(&self, scene: &SceneGraph, node: NodeId) -> Option<usize> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if let Some(index) = self.devices.iter().position(|device| device.node == id) {
                return Some(index);
            }
            cursor = scene.node(id).and_then(|n| n.parent());
        }
        None
    }
}
