use glam::{Quat, Vec3};

use super::graph::{NodeId, SceneGraph, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// Keyframe values for one animated property
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    pub fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyframes driving one property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub target: NodeId,
    /// Keyframe times in seconds, ascending
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

impl AnimationChannel {
    /// Keyframe pair around `time` and the blend between them
    fn locate(&self, time: f32) -> Option<(usize, usize, f32)> {
        let count = self.times.len().min(self.values.len());
        if count == 0 {
            return None;
        }
        if time <= self.times[0] {
            return Some((0, 0, 0.0));
        }
        if time >= self.times[count - 1] {
            return Some((count - 1, count - 1, 0.0));
        }

        let next = self.times[..count].partition_point(|t| *t <= time);
        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let blend = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear if span > 0.0 => (time - self.times[prev]) / span,
            Interpolation::Linear => 0.0,
        };
        Some((prev, next, blend))
    }

    /// Write the sampled value at `time` into `transform`
    pub fn sample_into(&self, time: f32, transform: &mut Transform) {
        let Some((a, b, t)) = self.locate(time) else {
            return;
        };
        match &self.values {
            ChannelValues::Translation(v) => transform.translation = v[a].lerp(v[b], t),
            ChannelValues::Rotation(v) => transform.rotation = v[a].slerp(v[b], t).normalize(),
            ChannelValues::Scale(v) => transform.scale = v[a].lerp(v[b], t),
        }
    }

    pub fn remap(&mut self, map: impl Fn(NodeId) -> Option<NodeId>) -> bool {
        match map(self.target) {
            Some(target) => {
                self.target = target;
                true
            }
            None => false,
        }
    }
}

/// Named set of channels played together
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Length in seconds (last keyframe time)
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<AnimationChannel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    /// Pose every targeted node at `time` seconds
    pub fn apply(&self, time: f32, scene: &mut SceneGraph) {
        for channel in &self.channels {
            if let Some(node) = scene.node_mut(channel.target) {
                channel.sample_into(time, &mut node.transform);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(interpolation: Interpolation) -> AnimationChannel {
        AnimationChannel {
            target: NodeId::from_index(0),
            times: vec![0.0, 1.0, 3.0],
            values: ChannelValues::Translation(vec![
                Vec3::ZERO,
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(10.0, 20.0, 0.0),
            ]),
            interpolation,
        }
    }

    #[test]
    fn test_linear_sampling() {
        let channel = slide(Interpolation::Linear);
        let mut transform = Transform::IDENTITY;

        channel.sample_into(0.5, &mut transform);
        assert_eq!(transform.translation, Vec3::new(5.0, 0.0, 0.0));

        channel.sample_into(2.0, &mut transform);
        assert_eq!(transform.translation, Vec3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_step_holds_previous_key() {
        let channel = slide(Interpolation::Step);
        let mut transform = Transform::IDENTITY;
        channel.sample_into(0.9, &mut transform);
        assert_eq!(transform.translation, Vec3::ZERO);
    }

    #[test]
    fn test_sampling_clamps_outside_range() {
        let channel = slide(Interpolation::Linear);
        let mut transform = Transform::IDENTITY;
        channel.sample_into(-1.0, &mut transform);
        assert_eq!(transform.translation, Vec3::ZERO);
        channel.sample_into(99.0, &mut transform);
        assert_eq!(transform.translation, Vec3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_clip_duration_is_last_key() {
        let clip = AnimationClip::new("slide", vec![slide(Interpolation::Linear)]);
        assert_eq!(clip.duration, 3.0);
    }
}
