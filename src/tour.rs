//! Guided camera tours: a script of waypoints realised as one chain of
//! camera tweens that can be cancelled back to the home viewpoint.

use std::path::Path;

use glam::Vec3;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPose, ViewState};
use crate::error::{ConfigError, TourError, TweenError};
use crate::tween::{Easing, StartAt, Tween, TweenEngine, TweenId};

/// One stop of a tour and how the camera gets there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    pub target: Vec3,
    pub duration_ms: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl Waypoint {
    pub fn new(position: Vec3, target: Vec3, duration_ms: f64, easing: Easing) -> Self {
        Self {
            position,
            target,
            duration_ms,
            easing,
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose::new(self.position, self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourScript {
    pub waypoints: Vec<Waypoint>,
}

impl TourScript {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            what: "tour script".to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Sum of all segment durations
    pub fn total_duration_ms(&self) -> f64 {
        self.waypoints.iter().map(|w| w.duration_ms).sum()
    }

    /// Ground-level patrol along the substation yard, ending on an overview
    pub fn patrol() -> Self {
        let eye = 1.45;
        let stop = |x1: f32, z1: f32, x2: f32, z2: f32, duration_ms: f64, easing: Easing| {
            Waypoint::new(Vec3::new(x1, eye, z1), Vec3::new(x2, eye, z2), duration_ms, easing)
        };

        Self::new(vec![
            stop(-47.46, 6.01, -25.23, 6.01, 2000.0, Easing::Linear),
            stop(34.92, 6.01, 47.16, 6.01, 6000.0, Easing::Linear),
            stop(39.27, 8.29, 39.3, 4.67, 2000.0, Easing::QuadraticInOut),
            stop(38.94, -15.85, 38.94, -17.77, 2500.0, Easing::Linear),
            stop(40.81, -18.95, 38.31, -18.7, 2000.0, Easing::QuadraticInOut),
            stop(-38.12, -18.95, -47.36, -18.09, 6000.0, Easing::Linear),
            stop(-42.01, -19.7, -41.91, -17.7, 2000.0, Easing::QuadraticInOut),
            stop(-41.86, 1.82, -41.83, 3.29, 2500.0, Easing::Linear),
            stop(-44.21, 5.97, -41.51, 5.61, 2000.0, Easing::QuadraticInOut),
            Waypoint::new(
                Vec3::new(-80.0, 70.0, 40.0),
                Vec3::new(-25.0, 5.0, 0.0),
                2000.0,
                Easing::QuadraticInOut,
            ),
        ])
    }
}

impl Default for TourScript {
    fn default() -> Self {
        Self::patrol()
    }
}

/// Tween that moves the camera and control target between two poses
pub fn camera_flight(
    from: CameraPose,
    to: CameraPose,
    duration_ms: f64,
    easing: Easing,
) -> Result<Tween<CameraPose, ViewState>, TweenError> {
    Ok(Tween::from(from)
        .to(to, duration_ms)?
        .easing(easing)
        .on_update(|pose, view: &mut ViewState| view.apply_pose(pose)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourState {
    Idle,
    Touring,
    Cancelling,
}

/// Drives at most one tour at a time
pub struct CameraTour {
    state: TourState,
    segments: Vec<TweenId>,
    home_flight: Option<TweenId>,
    home: CameraPose,
    home_duration_ms: f64,
}

impl CameraTour {
    pub fn new(home: CameraPose, home_duration_ms: f64) -> Self {
        Self {
            state: TourState::Idle,
            segments: Vec::new(),
            home_flight: None,
            home,
            home_duration_ms,
        }
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn home(&self) -> CameraPose {
        self.home
    }

    /// Segment currently moving the camera, if touring
    pub fn current_segment(&self, engine: &TweenEngine<ViewState>) -> Option<TweenId> {
        self.segments.iter().copied().find(|id| engine.is_alive(*id))
    }

    /// Build the chain `from -> waypoint 1 -> ... -> waypoint n` and start it
    ///
    /// A tour or return flight already in progress is discarded once the new
    /// script has been validated; its finish callback never runs. A rejected
    /// script leaves the running tour alone. `on_finish` runs once, after the
    /// last segment completes.
    pub fn start(
        &mut self,
        engine: &mut TweenEngine<ViewState>,
        script: &TourScript,
        from: CameraPose,
        at: impl Into<StartAt>,
        on_finish: impl FnOnce(&mut ViewState) + 'static,
    ) -> Result<(), TourError> {
        if script.is_empty() {
            return Err(TourError::EmptyScript);
        }

        let mut previous = from;
        let mut segments = script
            .waypoints
            .iter()
            .map(|waypoint| {
                let segment =
                    camera_flight(previous, waypoint.pose(), waypoint.duration_ms, waypoint.easing);
                previous = waypoint.pose();
                segment
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.state != TourState::Idle {
            warn!("Tour started while {:?}; cancelling the previous one", self.state);
            self.discard(engine);
        }

        if let Some(last) = segments.pop() {
            segments.push(last.on_complete(move |_, view: &mut ViewState| on_finish(view)));
        }
        let ids: Vec<TweenId> = segments.into_iter().map(|tween| engine.add(tween)).collect();

        for pair in ids.windows(2) {
            engine.chain(pair[0], pair[1])?;
        }
        engine.start(ids[0], at)?;

        info!(
            "Tour started: {} segments, {:.0} ms",
            ids.len(),
            script.total_duration_ms()
        );
        self.segments = ids;
        self.state = TourState::Touring;
        Ok(())
    }

    /// Cancel a running tour and fly back home
    ///
    /// Returns false, doing nothing, unless a tour is running.
    pub fn stop(
        &mut self,
        engine: &mut TweenEngine<ViewState>,
        from: CameraPose,
        at: impl Into<StartAt>,
    ) -> Result<bool, TourError> {
        if self.state != TourState::Touring {
            debug!("Tour stop ignored while {:?}", self.state);
            return Ok(false);
        }

        let flight = camera_flight(from, self.home, self.home_duration_ms, Easing::QuadraticInOut)?;
        self.discard(engine);

        let id = engine.add(flight);
        engine.start(id, at)?;
        self.home_flight = Some(id);
        self.state = TourState::Cancelling;
        info!("Tour cancelled; returning home");
        Ok(true)
    }

    /// Settle back to idle once the tour or return flight has finished
    pub fn sync(&mut self, engine: &TweenEngine<ViewState>) {
        let finished = match self.state {
            TourState::Idle => return,
            TourState::Touring => self.current_segment(engine).is_none(),
            TourState::Cancelling => !self.home_flight.is_some_and(|id| engine.is_alive(id)),
        };
        if finished {
            debug!("Tour {:?} finished", self.state);
            self.segments.clear();
            self.home_flight = None;
            self.state = TourState::Idle;
        }
    }

    /// Drop every tween this tour owns without firing callbacks
    fn discard(&mut self, engine: &mut TweenEngine<ViewState>) {
        if let Some(current) = self.current_segment(engine) {
            engine.discard_chain(current);
        }
        for id in self.segments.drain(..) {
            engine.stop(id);
        }
        if let Some(id) = self.home_flight.take() {
            engine.stop(id);
        }
        self.state = TourState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patrol_route() {
        let script = TourScript::default();
        assert_eq!(script.len(), 10);
        assert_eq!(script.total_duration_ms(), 29_000.0);
        assert_eq!(script.waypoints[1].duration_ms, 6000.0);
        assert_eq!(script.waypoints[2].easing, Easing::QuadraticInOut);
        assert_eq!(script.waypoints[9].position, Vec3::new(-80.0, 70.0, 40.0));
    }

    #[test]
    fn test_script_from_json() {
        let script = TourScript::from_json(
            r#"{"waypoints":[
                {"position":[1,2,3],"target":[0,0,0],"duration_ms":1000,"easing":"cubic-out"},
                {"position":[4,5,6],"target":[0,1,0],"duration_ms":500}
            ]}"#,
        )
        .unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(script.waypoints[0].easing, Easing::CubicOut);
        assert_eq!(script.waypoints[1].easing, Easing::Linear);
        assert_eq!(script.waypoints[1].pose().target, Vec3::Y);
    }

    #[test]
    fn test_bad_easing_id_is_a_parse_error() {
        let result = TourScript::from_json(
            r#"{"waypoints":[{"position":[0,0,0],"target":[0,0,0],"duration_ms":1,"easing":"wobble"}]}"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_empty_script_is_rejected() {
        let mut engine = TweenEngine::new();
        let mut tour = CameraTour::new(CameraPose::HOME, 1000.0);
        let result = tour.start(&mut engine, &TourScript::new(vec![]), CameraPose::HOME, 0.0, |_| {});
        assert_eq!(result, Err(TourError::EmptyScript));
        assert_eq!(tour.state(), TourState::Idle);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_invalid_segment_leaves_engine_untouched() {
        let mut engine = TweenEngine::new();
        let mut tour = CameraTour::new(CameraPose::HOME, 1000.0);
        let script = TourScript::new(vec![
            Waypoint::new(Vec3::X, Vec3::ZERO, 100.0, Easing::Linear),
            Waypoint::new(Vec3::Y, Vec3::ZERO, -1.0, Easing::Linear),
        ]);
        let result = tour.start(&mut engine, &script, CameraPose::HOME, 0.0, |_| {});
        assert!(matches!(result, Err(TourError::Tween(TweenError::InvalidDuration(_)))));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_rejected_restart_keeps_the_running_tour() {
        let mut engine = TweenEngine::new();
        let mut view = ViewState::new(1.0, CameraPose::HOME);
        let mut tour = CameraTour::new(CameraPose::HOME, 1000.0);
        let script = TourScript::new(vec![
            Waypoint::new(Vec3::new(30.0, 15.0, 0.0), Vec3::ZERO, 1000.0, Easing::Linear),
            Waypoint::new(Vec3::new(0.0, 20.0, 30.0), Vec3::ZERO, 1000.0, Easing::Linear),
        ]);
        tour.start(&mut engine, &script, CameraPose::HOME, 0.0, |_| {}).unwrap();
        engine.update(500.0, &mut view);
        let running = tour.current_segment(&engine).unwrap();

        let bad = TourScript::new(vec![Waypoint::new(Vec3::Y, Vec3::ZERO, -1.0, Easing::Linear)]);
        let result = tour.start(&mut engine, &bad, view.pose(), 500.0, |_| {});

        assert!(matches!(result, Err(TourError::Tween(TweenError::InvalidDuration(_)))));
        assert_eq!(tour.state(), TourState::Touring);
        assert_eq!(tour.current_segment(&engine), Some(running));
        assert_eq!(engine.len(), 2);
        assert!(engine.is_active(running));
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut engine = TweenEngine::new();
        let mut tour = CameraTour::new(CameraPose::HOME, 1000.0);
        assert_eq!(tour.stop(&mut engine, CameraPose::HOME, 0.0), Ok(false));
        assert!(engine.is_empty());
    }
}
