use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::error::TweenError;

/// A value a tween can move between two endpoints
pub trait Interpolate: Clone {
    /// Verify `end` has the same shape as `self`
    fn check_shape(&self, _end: &Self) -> Result<(), TweenError> {
        Ok(())
    }

    /// Value at eased progress `t` (0 = self, 1 = end)
    fn interpolate(&self, end: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self + (end - self) * t
    }
}

impl Interpolate for f32 {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self + (end - self) * t as f32
    }
}

impl Interpolate for Vec2 {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self.lerp(*end, t as f32)
    }
}

impl Interpolate for Vec3 {
    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self.lerp(*end, t as f32)
    }
}

/// String-keyed bag of numeric fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag(BTreeMap<String, f64>);

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FieldBag {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Interpolate for FieldBag {
    fn check_shape(&self, end: &Self) -> Result<(), TweenError> {
        let missing: Vec<String> = self
            .0
            .keys()
            .filter(|key| !end.0.contains_key(*key))
            .cloned()
            .collect();
        let unexpected: Vec<String> = end
            .0
            .keys()
            .filter(|key| !self.0.contains_key(*key))
            .cloned()
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(TweenError::MalformedBag {
                missing,
                unexpected,
            })
        }
    }

    fn interpolate(&self, end: &Self, t: f64) -> Self {
        self.0
            .iter()
            .map(|(key, start)| {
                let target = end.0.get(key).copied().unwrap_or(*start);
                (key.clone(), start.interpolate(&target, t))
            })
            .collect()
    }
}
