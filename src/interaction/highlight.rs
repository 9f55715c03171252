//! The "warming" cycle: every interval one random device is lit up and the
//! camera flies over to look at it.

use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::devices::DeviceRegistry;
use crate::camera::{CameraPose, ViewState};
use crate::core::timer::Interval;
use crate::error::TweenError;
use crate::math::Color;
use crate::scene::{MaterialId, NodeId, SceneGraph};
use crate::tour::camera_flight;
use crate::tween::{Easing, StartAt, TweenEngine, TweenId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub interval_ms: f64,
    pub emissive: Color,
    /// Camera position relative to the device center
    pub view_offset: Vec3,
    pub flight_ms: f64,
    pub home_flight_ms: f64,
    /// Fixed seed for the device choice; entropy when absent
    pub seed: Option<u64>,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5000.0,
            emissive: Color::from_hex(0xff0000),
            view_offset: Vec3::new(10.0, 10.0, 10.0),
            flight_ms: 1500.0,
            home_flight_ms: 2000.0,
            seed: None,
        }
    }
}

/// A mesh pointed at a private highlight material
#[derive(Debug, Clone, Copy)]
struct Swapped {
    mesh: NodeId,
    original: MaterialId,
    highlight: MaterialId,
}

#[derive(Debug, Clone)]
struct Highlighted {
    device: usize,
    swapped: Vec<Swapped>,
}

pub struct HighlightCycle {
    settings: HighlightSettings,
    timer: Interval,
    rng: StdRng,
    current: Option<Highlighted>,
    flight: Option<TweenId>,
}

impl HighlightCycle {
    pub fn new(settings: HighlightSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            timer: Interval::new(settings.interval_ms),
            settings,
            rng,
            current: None,
            flight: None,
        }
    }

    pub fn settings(&self) -> &HighlightSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Index of the highlighted device in the registry
    pub fn current_device(&self) -> Option<usize> {
        self.current.as_ref().map(|h| h.device)
    }

    /// Start the timer; the first device is lit one interval later
    pub fn start(&mut self) -> bool {
        if self.timer.is_running() {
            return false;
        }
        self.timer.start();
        info!("Warming cycle started ({} ms)", self.settings.interval_ms);
        true
    }

    /// Advance the timer and move the highlight when it fires
    pub fn tick(
        &mut self,
        delta_ms: f64,
        scene: &mut SceneGraph,
        devices: &DeviceRegistry,
        engine: &mut TweenEngine<ViewState>,
        from: CameraPose,
        now_ms: f64,
    ) -> Result<Option<usize>, TweenError> {
        if !self.timer.tick(delta_ms) {
            return Ok(None);
        }
        self.highlight_next(scene, devices, engine, from, now_ms)
    }

    /// Restore the current device, then light a random one and fly to it
    ///
    /// The same device may be picked twice in a row.
    pub fn highlight_next(
        &mut self,
        scene: &mut SceneGraph,
        devices: &DeviceRegistry,
        engine: &mut TweenEngine<ViewState>,
        from: CameraPose,
        now_ms: f64,
    ) -> Result<Option<usize>, TweenError> {
        self.restore(scene);
        if devices.is_empty() {
            return Ok(None);
        }

        let index = self.rng.gen_range(0..devices.len());
        let Some(device) = devices.get(index) else {
            return Ok(None);
        };

        let bounds = scene.world_bounds(device.node);
        let center = if bounds.is_empty() {
            scene.world_matrix(device.node).transform_point3(Vec3::ZERO)
        } else {
            bounds.center()
        };
        let view = CameraPose::new(center + self.settings.view_offset, center);
        self.fly(engine, from, view, self.settings.flight_ms, StartAt::Time(now_ms))?;

        let swapped = scene
            .meshes_under(device.node)
            .into_iter()
            .filter_map(|mesh| {
                let original = scene.node(mesh)?.material()?;
                let highlight = scene.materials.clone_material(original)?;
                if let Some(material) = scene.materials.get_mut(highlight) {
                    material.emissive = self.settings.emissive;
                }
                scene.set_material(mesh, highlight);
                Some(Swapped {
                    mesh,
                    original,
                    highlight,
                })
            })
            .collect();

        debug!("Highlighting device '{}'", device.name);
        self.current = Some(Highlighted {
            device: index,
            swapped,
        });
        Ok(Some(index))
    }

    /// Stop the timer, restore the lit device and fly home
    ///
    /// Returns false, doing nothing, when the cycle is not running.
    pub fn stop(
        &mut self,
        scene: &mut SceneGraph,
        engine: &mut TweenEngine<ViewState>,
        from: CameraPose,
        home: CameraPose,
        at: impl Into<StartAt>,
    ) -> Result<bool, TweenError> {
        if !self.timer.is_running() && self.current.is_none() {
            return Ok(false);
        }
        self.timer.stop();
        self.restore(scene);
        self.fly(engine, from, home, self.settings.home_flight_ms, at.into())?;
        info!("Warming cycle stopped");
        Ok(true)
    }

    /// Put the original materials back and release the highlight copies
    pub fn restore(&mut self, scene: &mut SceneGraph) {
        let Some(highlighted) = self.current.take() else {
            return;
        };
        for swap in highlighted.swapped {
            scene.set_material(swap.mesh, swap.original);
            scene.materials.remove(swap.highlight);
        }
    }

    fn fly(
        &mut self,
        engine: &mut TweenEngine<ViewState>,
        from: CameraPose,
        to: CameraPose,
        duration_ms: f64,
        at: StartAt,
    ) -> Result<(), TweenError> {
        if let Some(previous) = self.flight.take() {
            engine.stop(previous);
        }
        let id = engine.add(camera_flight(from, to, duration_ms, Easing::QuadraticInOut)?);
        engine.start(id, at)?;
        self.flight = Some(id);
        Ok(())
    }
}
