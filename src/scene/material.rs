use glam::Vec2;

use crate::math::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(usize);

impl MaterialId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Placement of a material's color map in UV space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSlot {
    pub offset: Vec2,
    pub repeat: Vec2,
}

impl TextureSlot {
    pub fn new(repeat: Vec2) -> Self {
        Self {
            offset: Vec2::ZERO,
            repeat,
        }
    }
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self::new(Vec2::ONE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Color,
    pub emissive: Color,
    pub opacity: f32,
    pub map: Option<TextureSlot>,
    /// Ignore scene lighting and show the base color as is
    pub unlit: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, base_color: Color) -> Self {
        Self {
            name: name.into(),
            base_color,
            emissive: Color::BLACK,
            opacity: 1.0,
            map: None,
            unlit: false,
        }
    }

    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_map(mut self, map: TextureSlot) -> Self {
        self.map = Some(map);
        self
    }

    pub fn unlit(mut self) -> Self {
        self.unlit = true;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", Color::WHITE)
    }
}

/// Materials shared by id among the meshes that use them
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    slots: Vec<Option<Material>>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialId {
        self.slots.push(Some(material));
        MaterialId(self.slots.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Add a private copy of `id`
    pub fn clone_material(&mut self, id: MaterialId) -> Option<MaterialId> {
        let copy = self.get(id)?.clone();
        Some(self.add(copy))
    }

    /// Release a material; its id is never reused
    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Number of live materials
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|m| (MaterialId(index), m)))
    }
}
