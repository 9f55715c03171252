use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use substation_viewport::camera::{CameraPose, ViewState};
use substation_viewport::tour::{CameraTour, TourScript, TourState, Waypoint};
use substation_viewport::tween::{Easing, TweenEngine};
use substation_viewport::TourError;

const TARGET: Vec3 = Vec3::new(0.0, 5.0, 0.0);

fn three_stop_script() -> TourScript {
    TourScript::new(vec![
        Waypoint::new(Vec3::new(30.0, 15.0, 0.0), TARGET, 1000.0, Easing::Linear),
        Waypoint::new(Vec3::new(0.0, 20.0, 30.0), TARGET, 2000.0, Easing::QuadraticInOut),
        Waypoint::new(Vec3::new(-25.0, 10.0, -25.0), TARGET, 1500.0, Easing::SinusoidalOut),
    ])
}

/// Tick at 60 Hz from `from_ms` up to `until_ms`
fn run(engine: &mut TweenEngine<ViewState>, tour: &mut CameraTour, view: &mut ViewState, from_ms: f64, until_ms: f64) {
    let mut now = from_ms;
    while now <= until_ms {
        engine.update(now, view);
        tour.sync(engine);
        now += 1000.0 / 60.0;
    }
}

#[cfg(test)]
mod camera_tour_tests {
    use super::*;

    #[test]
    fn test_three_waypoints_finish_after_total_duration() {
        let script = three_stop_script();
        assert_eq!(script.total_duration_ms(), 4500.0);

        let mut engine = TweenEngine::new();
        let mut view = ViewState::new(1.0, CameraPose::HOME);
        let mut tour = CameraTour::new(CameraPose::HOME, 2000.0);
        let finished_at = Rc::new(Cell::new(None));
        let calls = Rc::new(Cell::new(0));

        let (at, count) = (Rc::clone(&finished_at), Rc::clone(&calls));
        tour.start(&mut engine, &script, view.pose(), 0.0, move |view: &mut ViewState| {
            count.set(count.get() + 1);
            at.set(Some(view.camera.position));
        })
        .unwrap();
        assert_eq!(tour.state(), TourState::Touring);

        run(&mut engine, &mut tour, &mut view, 0.0, 4400.0);
        assert_eq!(calls.get(), 0);

        engine.update(4500.0, &mut view);
        tour.sync(&engine);
        assert_eq!(calls.get(), 1);
        assert_eq!(tour.state(), TourState::Idle);

        let last = Vec3::new(-25.0, 10.0, -25.0);
        assert!(view.camera.position.distance(last) < 1e-3);
        assert!(finished_at.get().unwrap().distance(last) < 1e-3);

        run(&mut engine, &mut tour, &mut view, 4600.0, 6000.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_stop_mid_chain_flies_home_and_skips_rest() {
        let script = three_stop_script();
        let mut engine = TweenEngine::new();
        let mut view = ViewState::new(1.0, CameraPose::HOME);
        let mut tour = CameraTour::new(CameraPose::HOME, 2000.0);
        let calls = Rc::new(Cell::new(0));
        let count = Rc::clone(&calls);
        tour.start(&mut engine, &script, view.pose(), 0.0, move |_: &mut ViewState| {
            count.set(count.get() + 1)
        })
        .unwrap();

        // inside the second segment
        run(&mut engine, &mut tour, &mut view, 0.0, 1500.0);
        assert!(tour.stop(&mut engine, view.pose(), 1500.0).unwrap());
        assert_eq!(tour.state(), TourState::Cancelling);
        assert_eq!(engine.len(), 1, "only the return flight remains");

        run(&mut engine, &mut tour, &mut view, 1500.0, 3600.0);
        assert_eq!(tour.state(), TourState::Idle);
        assert_eq!(calls.get(), 0);
        assert!(view.camera.position.distance(CameraPose::HOME.position) < 1e-3);
    }

    #[test]
    fn test_stop_when_idle_is_a_no_op() {
        let mut engine = TweenEngine::new();
        let view = ViewState::new(1.0, CameraPose::HOME);
        let mut tour = CameraTour::new(CameraPose::HOME, 2000.0);

        assert!(!tour.stop(&mut engine, view.pose(), 0.0).unwrap());
        assert!(engine.is_empty());
        assert_eq!(tour.state(), TourState::Idle);
    }

    #[test]
    fn test_second_start_replaces_running_tour() {
        let mut engine = TweenEngine::new();
        let mut view = ViewState::new(1.0, CameraPose::HOME);
        let mut tour = CameraTour::new(CameraPose::HOME, 2000.0);
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let count = Rc::clone(&first);
        tour.start(&mut engine, &three_stop_script(), view.pose(), 0.0, move |_: &mut ViewState| {
            count.set(count.get() + 1)
        })
        .unwrap();
        run(&mut engine, &mut tour, &mut view, 0.0, 500.0);

        let count = Rc::clone(&second);
        tour.start(&mut engine, &three_stop_script(), view.pose(), 500.0, move |_: &mut ViewState| {
            count.set(count.get() + 1)
        })
        .unwrap();
        assert_eq!(engine.len(), 3);

        run(&mut engine, &mut tour, &mut view, 500.0, 5100.0);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_empty_script_is_rejected() {
        let mut engine = TweenEngine::new();
        let mut tour = CameraTour::new(CameraPose::HOME, 2000.0);
        let err = tour
            .start(&mut engine, &TourScript::new(Vec::new()), CameraPose::HOME, 0.0, |_| {})
            .unwrap_err();
        assert_eq!(err, TourError::EmptyScript);
        assert_eq!(tour.state(), TourState::Idle);
    }

    #[test]
    fn test_script_from_json() {
        let json = r#"{ "waypoints": [
            { "position": [30, 15, 0], "target": [0, 5, 0], "duration_ms": 1000, "easing": "quadratic-in-out" },
            { "position": [0, 20, 30], "target": [0, 5, 0], "duration_ms": 500 }
        ] }"#;
        let script = TourScript::from_json(json).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.waypoints[0].easing, Easing::QuadraticInOut);
        assert_eq!(script.waypoints[1].easing, Easing::Linear);
        assert_eq!(script.total_duration_ms(), 1500.0);
    }
}
