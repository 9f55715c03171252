use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use substation_viewport::config::{ModelSpec, ViewportConfig};
use substation_viewport::core::{FrameBuffer, Rgba, SurfaceSize};
use substation_viewport::loaders::AssetLoader;
use substation_viewport::render::{ComposeTarget, Label, LabelPlacement, MixinContext, SceneRenderer};
use substation_viewport::scene::SceneGraph;
use substation_viewport::traits::{FramePresenter, FrameScheduler};
use substation_viewport::tween::Easing;
use substation_viewport::{
    CameraPose, PerspectiveCamera, RenderError, TourScript, TourState, ViewportEngine, ViewportError, Waypoint,
};

const FRAME_MS: f64 = 1000.0 / 60.0;
const BLUE: Rgba = Rgba::new(0, 0, 255, 255);

#[derive(Clone, Default)]
struct SharedScheduler {
    requested: Rc<Cell<u64>>,
}

impl FrameScheduler for SharedScheduler {
    fn request_frame(&mut self) {
        self.requested.set(self.requested.get() + 1);
    }
}

/// Presenter whose next result can be scripted from the test
#[derive(Clone, Default)]
struct SharedPresenter {
    presented: Rc<Cell<u64>>,
    fail_with: Rc<RefCell<Option<RenderError>>>,
    last_frame: Rc<RefCell<Option<FrameBuffer>>>,
    last_labels: Rc<RefCell<Vec<LabelPlacement>>>,
    resized: Rc<Cell<(u32, u32)>>,
}

impl FramePresenter for SharedPresenter {
    fn present(&mut self, frame: &FrameBuffer, labels: &[LabelPlacement]) -> Result<(), RenderError> {
        if let Some(err) = self.fail_with.borrow_mut().take() {
            return Err(err);
        }
        self.presented.set(self.presented.get() + 1);
        *self.last_frame.borrow_mut() = Some(frame.clone());
        *self.last_labels.borrow_mut() = labels.to_vec();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resized.set((width, height));
    }
}

struct CountingRenderer {
    calls: Rc<Cell<u32>>,
}

impl SceneRenderer for CountingRenderer {
    fn render(&mut self, _scene: &SceneGraph, _camera: &PerspectiveCamera, _frame: &mut FrameBuffer) -> anyhow::Result<()> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

fn quiet_config() -> ViewportConfig {
    ViewportConfig {
        models: Vec::new(),
        labels: Vec::new(),
        ..ViewportConfig::default()
    }
}

fn engine_with(config: ViewportConfig) -> (ViewportEngine, SharedScheduler, SharedPresenter) {
    let scheduler = SharedScheduler::default();
    let presenter = SharedPresenter::default();
    let engine = ViewportEngine::new(
        config,
        SurfaceSize::new(64, 48),
        scheduler.clone(),
        presenter.clone(),
    )
    .unwrap();
    (engine, scheduler, presenter)
}

const WAYPOINT: Vec3 = Vec3::new(30.0, 15.0, 0.0);

/// One linear flight from the home pose to `WAYPOINT`
fn single_stop(duration_ms: f64) -> TourScript {
    TourScript::new(vec![Waypoint::new(
        WAYPOINT,
        CameraPose::HOME.target,
        duration_ms,
        Easing::Linear,
    )])
}

fn camera_position(engine: &ViewportEngine) -> Vec3 {
    engine.view().camera.position
}

fn fill_blue(target: &mut ComposeTarget<'_>, _delta: f32) -> anyhow::Result<()> {
    for pixel in target.frame.pixels_mut() {
        *pixel = BLUE;
    }
    Ok(())
}

#[cfg(test)]
mod render_loop_tests {
    use super::*;

    #[test]
    fn test_every_tick_requests_the_next_frame() {
        let (mut engine, scheduler, presenter) = engine_with(quiet_config());
        engine.tick(0.0).unwrap();
        assert_eq!(scheduler.requested.get(), 0);

        engine.start().unwrap();
        assert_eq!(scheduler.requested.get(), 1);

        for i in 0..3 {
            let report = engine.tick(i as f64 * FRAME_MS).unwrap();
            assert!(report.rendered);
            assert_eq!(report.frame.number, i);
        }
        assert_eq!(scheduler.requested.get(), 4);
        assert_eq!(presenter.presented.get(), 3);
    }

    #[test]
    fn test_mixin_key_is_replaced_and_deleted() {
        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let counter = Rc::clone(&first);
        engine.set_mixin("spin", move |_: &mut MixinContext<'_>| -> anyhow::Result<()> {
            counter.set(counter.get() + 1);
            Ok(())
        });
        let counter = Rc::clone(&second);
        engine.set_mixin("spin", move |_: &mut MixinContext<'_>| -> anyhow::Result<()> {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert_eq!(engine.mixin_keys(), ["spin"]);

        engine.tick(0.0).unwrap();
        assert_eq!((first.get(), second.get()), (0, 1));

        assert!(engine.delete_mixin("spin"));
        assert!(!engine.delete_mixin("spin"));
        engine.tick(FRAME_MS).unwrap();
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_failing_mixin_does_not_stop_the_loop() {
        let (mut engine, scheduler, _) = engine_with(quiet_config());
        engine.start().unwrap();
        engine.set_mixin("broken", |_: &mut MixinContext<'_>| -> anyhow::Result<()> {
            anyhow::bail!("material missing")
        });

        for i in 0..3 {
            let report = engine.tick(i as f64 * FRAME_MS).unwrap();
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].key, "broken");
            assert!(report.rendered);
        }
        assert_eq!(scheduler.requested.get(), 4);
    }

    #[test]
    fn test_composers_replace_the_default_renderer() {
        let calls = Rc::new(Cell::new(0));
        let (engine, _, presenter) = engine_with(quiet_config());
        let mut engine = engine.with_renderer(CountingRenderer {
            calls: Rc::clone(&calls),
        });
        engine.start().unwrap();

        let report = engine.tick(0.0).unwrap();
        assert!(!report.composed);
        assert_eq!(calls.get(), 1);

        engine.set_composer("output", fill_blue);
        let report = engine.tick(FRAME_MS).unwrap();
        assert!(report.composed);
        assert_eq!(calls.get(), 1);
        let frame = presenter.last_frame.borrow().clone().unwrap();
        assert_eq!(frame.pixel(0, 0), Some(BLUE));

        engine.flags_mut().enable_composers = false;
        let report = engine.tick(2.0 * FRAME_MS).unwrap();
        assert!(!report.composed);
        assert_eq!(calls.get(), 2);

        engine.flags_mut().enable_composers = true;
        assert!(engine.delete_composer("output"));
        engine.tick(3.0 * FRAME_MS).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_labels_are_drawn_over_the_composed_frame() {
        let (mut engine, _, presenter) = engine_with(quiet_config());
        engine.labels_mut().add(Label::at("1号主变", Vec3::new(0.0, 5.0, 0.0)));
        engine.set_composer("output", fill_blue);
        engine.start().unwrap();

        let report = engine.tick(0.0).unwrap();
        assert_eq!(report.labels, 1);

        let labels = presenter.last_labels.borrow().clone();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "1号主变");
        assert!((labels[0].x - 32.0).abs() < 1.0);
        assert!((labels[0].y - 24.0).abs() < 1.0);

        let frame = presenter.last_frame.borrow().clone().unwrap();
        assert_ne!(frame.pixel(32, 24), Some(BLUE));
        assert_eq!(frame.pixel(0, 0), Some(BLUE));
    }

    #[test]
    fn test_fatal_present_error_halts_the_loop() {
        let (mut engine, scheduler, presenter) = engine_with(quiet_config());
        engine.start().unwrap();
        engine.tick(0.0).unwrap();
        assert_eq!(scheduler.requested.get(), 2);

        *presenter.fail_with.borrow_mut() = Some(RenderError::SurfaceLost);
        assert!(matches!(
            engine.tick(FRAME_MS),
            Err(ViewportError::Halted(RenderError::SurfaceLost))
        ));
        assert_eq!(engine.halted(), Some(&RenderError::SurfaceLost));
        assert!(!engine.is_running());

        let report = engine.tick(2.0 * FRAME_MS).unwrap();
        assert!(!report.rendered);
        assert_eq!(scheduler.requested.get(), 2);
        assert!(matches!(engine.start(), Err(ViewportError::Halted(_))));
    }

    #[test]
    fn test_transient_present_error_drops_one_frame() {
        let (mut engine, scheduler, presenter) = engine_with(quiet_config());
        engine.start().unwrap();

        *presenter.fail_with.borrow_mut() = Some(RenderError::Outdated);
        let report = engine.tick(0.0).unwrap();
        assert!(!report.rendered);
        assert!(engine.is_running());

        let report = engine.tick(FRAME_MS).unwrap();
        assert!(report.rendered);
        assert_eq!(scheduler.requested.get(), 3);
    }

    #[test]
    fn test_failed_load_leaves_the_scene_unchanged() {
        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();
        let nodes_before = engine.scene().len();

        let loader = AssetLoader::new(std::env::temp_dir());
        engine.load_model(&loader, ModelSpec::devices("/no-such-devices.glb"));
        assert_eq!(engine.pending_loads(), 1);

        let mut failed = Vec::new();
        let mut now = 0.0;
        while engine.pending_loads() > 0 {
            let report = engine.tick(now).unwrap();
            failed.extend(report.failed_loads);
            now += FRAME_MS;
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(failed, ["/no-such-devices.glb"]);
        assert_eq!(engine.scene().len(), nodes_before);
        assert!(engine.devices().is_empty());
        assert!(engine.is_running());
    }

    #[test]
    fn test_resolved_load_is_attached_by_a_tick() {
        let dir = std::env::temp_dir().join(format!("substation-viewport-{}-loop", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("devices.gltf"),
            r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0, 1] }],
  "nodes": [
    { "name": "主变" },
    { "name": "断路器", "translation": [5.0, 0.0, 0.0] }
  ]
}"#,
        )
        .unwrap();

        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();
        engine.load_model(&AssetLoader::new(&dir), ModelSpec::devices("devices.gltf"));

        let mut attached = Vec::new();
        let mut now = 0.0;
        while engine.pending_loads() > 0 {
            let report = engine.tick(now).unwrap();
            attached.extend(report.attached);
            now += FRAME_MS;
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(attached, ["devices"]);
        assert_eq!(engine.models().len(), 1);
        let names: Vec<&str> = engine.devices().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["主变", "断路器"]);
    }

    #[test]
    fn test_resize_updates_frame_camera_and_presenter() {
        let (mut engine, _, presenter) = engine_with(quiet_config());
        engine.resize(200, 100);

        assert_eq!(engine.frame().dimensions(), (200, 100));
        assert!((engine.view().camera.aspect() - 2.0).abs() < 1e-6);
        assert_eq!(presenter.resized.get(), (200, 100));

        engine.resize(0, 0);
        assert_eq!(engine.surface(), SurfaceSize::new(1, 1));
    }

    #[test]
    fn test_picking_honours_the_flag() {
        let (mut engine, _, _) = engine_with(quiet_config());
        // the view ray through the center reaches the ground plane
        assert!(!engine.pick(32.0, 24.0).is_empty());

        engine.flags_mut().enable_picking = false;
        assert!(engine.pick(32.0, 24.0).is_empty());
    }

    #[test]
    fn test_tween_step_is_visible_to_mixins_and_composers_in_the_same_tick() {
        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();

        let frames = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&frames);
        engine.set_mixin("record", move |ctx: &mut MixinContext<'_>| -> anyhow::Result<()> {
            seen.borrow_mut().push(ctx.frame);
            Ok(())
        });
        let positions = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&positions);
        engine.set_composer("record", move |target: &mut ComposeTarget<'_>, _: f32| -> anyhow::Result<()> {
            seen.borrow_mut().push(target.camera.position);
            Ok(())
        });

        engine.start_tour_with(&single_stop(1000.0), |_| {}).unwrap();
        for now in [0.0, 500.0, 1000.0] {
            engine.tick(now).unwrap();
        }

        let frames = frames.borrow();
        let numbers: Vec<u64> = frames.iter().map(|frame| frame.number).collect();
        assert_eq!(numbers, [0, 1, 2]);
        assert_eq!(frames[1].time_ms, 500.0);

        let positions = positions.borrow();
        let home = CameraPose::HOME.position;
        assert!(positions[0].distance(home) < 1e-3);
        assert!(positions[1].distance(home.lerp(WAYPOINT, 0.5)) < 1e-3);
        assert!(positions[2].distance(WAYPOINT) < 1e-3);
    }

    #[test]
    fn test_tour_started_before_the_first_tick_does_not_jump() {
        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();
        engine.start_tour_with(&single_stop(2000.0), |_| {}).unwrap();

        // the host clock has been running for a while before the first frame
        engine.tick(1500.0).unwrap();
        assert!(camera_position(&engine).distance(CameraPose::HOME.position) < 1e-3);

        engine.tick(2500.0).unwrap();
        let halfway = CameraPose::HOME.position.lerp(WAYPOINT, 0.5);
        assert!(camera_position(&engine).distance(halfway) < 1e-3);
    }

    #[test]
    fn test_tour_start_tick_stop_tick_returns_home() {
        let (mut engine, _, _) = engine_with(quiet_config());
        engine.start().unwrap();
        let finished = Rc::new(Cell::new(0));

        let count = Rc::clone(&finished);
        engine
            .start_tour_with(&single_stop(1000.0), move |_| count.set(count.get() + 1))
            .unwrap();
        assert_eq!(engine.tour_state(), TourState::Touring);
        engine.tick(0.0).unwrap();
        engine.tick(500.0).unwrap();
        assert!(camera_position(&engine).distance(CameraPose::HOME.position) > 1.0);

        assert!(engine.stop_tour().unwrap());
        assert_eq!(engine.tour_state(), TourState::Cancelling);
        assert!(!engine.stop_tour().unwrap());

        // the return flight is timed from the tick after the stop
        engine.tick(600.0).unwrap();
        assert_eq!(engine.tour_state(), TourState::Cancelling);
        engine.tick(600.0 + quiet_config().home_flight_ms).unwrap();
        assert_eq!(engine.tour_state(), TourState::Idle);
        assert!(camera_position(&engine).distance(CameraPose::HOME.position) < 1e-3);
        assert_eq!(finished.get(), 0);

        let count = Rc::clone(&finished);
        engine
            .start_tour_with(&single_stop(1000.0), move |_| count.set(count.get() + 1))
            .unwrap();
        engine.tick(5000.0).unwrap();
        engine.tick(6000.0).unwrap();
        assert_eq!(engine.tour_state(), TourState::Idle);
        assert!(camera_position(&engine).distance(WAYPOINT) < 1e-3);
        assert_eq!(finished.get(), 1);

        engine.tick(7000.0).unwrap();
        assert_eq!(finished.get(), 1);
        assert!(!engine.stop_tour().unwrap());
    }
}
