//! The render loop coordinator. A `ViewportEngine` owns the scene, the camera
//! rig, the tween engine and every per-frame registry, and turns one host
//! frame callback into one tick:
//!
//! attach resolved loads, advance tweens, settle the tour, advance the
//! highlight timer, update the orbit rig, run mixins, run composers (or the
//! default renderer), place labels, present, then ask for the next frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use glam::{Vec2, Vec3};
use log::{debug, error, info, warn};

use crate::camera::{CameraPose, ViewState};
use crate::config::{EngineFlags, ModelRole, ModelSpec, ViewportConfig};
use crate::core::frame_buffer::FrameBuffer;
use crate::core::registry::KeyedRegistry;
use crate::core::surface::SurfaceSize;
use crate::error::{CallbackFailure, CallbackKind, RenderError, ViewportError};
use crate::frame::{FrameCounter, FrameInfo};
use crate::interaction::{self, DeviceRegistry, HighlightCycle, PickHit};
use crate::loaders::{AssetLoader, LoadTask};
use crate::math::AABB;
use crate::render::{
    AnimationMixer, ComposeTarget, Composer, Label, LabelOverlay, MixinContext, RaycastRenderer,
    RenderMixin, SceneRenderer, TextureScroll,
};
use crate::scene::{
    AmbientLight, AttachedModel, Material, NodeKind, SceneGraph, SceneSubgraph, TextureSlot,
    Transform,
};
use crate::tour::{CameraTour, TourScript, TourState};
use crate::traits::{FramePresenter, FrameScheduler};
use crate::tween::{StartAt, TweenEngine};

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: FrameInfo,
    /// A frame was drawn and handed to the presenter
    pub rendered: bool,
    /// Composers drew the frame instead of the default renderer
    pub composed: bool,
    pub failures: Vec<CallbackFailure>,
    /// Models attached at the start of this tick
    pub attached: Vec<String>,
    /// Urls whose load failed; the scene carries on without them
    pub failed_loads: Vec<String>,
    pub labels: usize,
}

impl TickReport {
    fn skipped(frame: FrameInfo) -> Self {
        Self {
            frame,
            rendered: false,
            composed: false,
            failures: Vec::new(),
            attached: Vec::new(),
            failed_loads: Vec::new(),
            labels: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lifecycle {
    Created,
    Running,
    Halted(RenderError),
    Disposed,
}

struct PendingModel {
    spec: ModelSpec,
    task: LoadTask,
}

pub struct ViewportEngine {
    config: ViewportConfig,
    flags: EngineFlags,
    lifecycle: Lifecycle,
    surface: SurfaceSize,
    frame: FrameBuffer,
    counter: FrameCounter,

    scene: SceneGraph,
    view: ViewState,
    tweens: TweenEngine<ViewState>,
    tour: CameraTour,
    script: TourScript,
    highlight: HighlightCycle,
    devices: DeviceRegistry,
    models: Vec<AttachedModel>,
    pending: Vec<PendingModel>,

    mixins: KeyedRegistry<Box<dyn RenderMixin>>,
    composers: KeyedRegistry<Box<dyn Composer>>,
    renderer: Box<dyn SceneRenderer>,
    labels: LabelOverlay,

    scheduler: Box<dyn FrameScheduler>,
    presenter: Box<dyn FramePresenter>,
}

impl ViewportEngine {
    /// Build the scene, camera rig and registries for one viewport
    ///
    /// Fails only when the configured tour script cannot be read.
    pub fn new(
        config: ViewportConfig,
        surface: SurfaceSize,
        scheduler: impl FrameScheduler + 'static,
        presenter: impl FramePresenter + 'static,
    ) -> Result<Self, ViewportError> {
        let script = match &config.tour {
            Some(path) => TourScript::load(path)?,
            None => TourScript::patrol(),
        };

        let mut scene = SceneGraph::new();
        build_scenery(&mut scene, &config);

        let mut labels = LabelOverlay::new();
        for spec in &config.labels {
            labels.add(Label::at(spec.text.clone(), spec.position));
        }

        let renderer = RaycastRenderer::new(config.clear_color, config.clear_alpha, config.preview_scale);

        Ok(Self {
            flags: config.flags,
            lifecycle: Lifecycle::Created,
            surface,
            frame: FrameBuffer::new(surface.width, surface.height),
            counter: FrameCounter::new(),
            scene,
            view: ViewState::new(surface.aspect(), config.home),
            tweens: TweenEngine::new(),
            tour: CameraTour::new(config.home, config.home_flight_ms),
            script,
            highlight: HighlightCycle::new(config.highlight.clone()),
            devices: DeviceRegistry::new(),
            models: Vec::new(),
            pending: Vec::new(),
            mixins: KeyedRegistry::new(),
            composers: KeyedRegistry::new(),
            renderer: Box::new(renderer),
            labels,
            scheduler: Box::new(scheduler),
            presenter: Box::new(presenter),
            config,
        })
    }

    /// Swap the default renderer used when no composer runs
    pub fn with_renderer(mut self, renderer: impl SceneRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Begin ticking
    ///
    /// Calling this while running does nothing. The warming cycle starts
    /// along with the loop when its flag is set.
    pub fn start(&mut self) -> Result<(), ViewportError> {
        match &self.lifecycle {
            Lifecycle::Disposed => return Err(ViewportError::Disposed),
            Lifecycle::Halted(err) => return Err(ViewportError::Halted(err.clone())),
            Lifecycle::Running => return Ok(()),
            Lifecycle::Created => {}
        }

        self.lifecycle = Lifecycle::Running;
        info!(
            "Viewport started at {}x{}",
            self.surface.width, self.surface.height
        );
        if self.flags.enable_warming_cycle {
            self.highlight.start();
        }
        self.scheduler.request_frame();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    /// Fatal error that stopped the loop, if any
    pub fn halted(&self) -> Option<&RenderError> {
        match &self.lifecycle {
            Lifecycle::Halted(err) => Some(err),
            _ => None,
        }
    }

    /// Run one tick for the host frame at `now_ms`
    ///
    /// Before `start` and after a fatal halt this draws nothing and requests
    /// no further frames.
    pub fn tick(&mut self, now_ms: f64) -> Result<TickReport, ViewportError> {
        match self.lifecycle {
            Lifecycle::Disposed => return Err(ViewportError::Disposed),
            Lifecycle::Created | Lifecycle::Halted(_) => {
                return Ok(TickReport::skipped(FrameInfo::new(
                    self.counter.frame_number(),
                    now_ms,
                    0.0,
                )))
            }
            Lifecycle::Running => {}
        }

        let frame = self.counter.advance(now_ms);
        let mut report = TickReport::skipped(frame);

        self.attach_resolved(&mut report);

        self.tweens.update(now_ms, &mut self.view);
        self.tour.sync(&self.tweens);

        let from = self.view.pose();
        if let Err(err) = self.highlight.tick(
            frame.delta_ms(),
            &mut self.scene,
            &self.devices,
            &mut self.tweens,
            from,
            now_ms,
        ) {
            warn!("Highlight cycle step failed: {err}");
        }

        self.view.controls.update(&mut self.view.camera);

        let mut ctx = MixinContext {
            scene: &mut self.scene,
            frame,
        };
        for (key, mixin) in self.mixins.iter_mut() {
            report
                .failures
                .extend(isolate(CallbackKind::Mixin, key, || mixin.update(&mut ctx)));
        }

        report.composed = self.flags.enable_composers && !self.composers.is_empty();
        if report.composed {
            let mut target = ComposeTarget {
                scene: &self.scene,
                camera: &self.view.camera,
                frame: &mut self.frame,
            };
            for (key, composer) in self.composers.iter_mut() {
                report.failures.extend(isolate(CallbackKind::Composer, key, || {
                    composer.render(&mut target, frame.delta_secs)
                }));
            }
        } else {
            let renderer = &mut self.renderer;
            let (scene, camera, target) = (&self.scene, &self.view.camera, &mut self.frame);
            report.failures.extend(isolate(CallbackKind::Renderer, "default", || {
                renderer.render(scene, camera, target)
            }));
        }

        let placements = self.labels.render(&self.scene, &self.view.camera, &mut self.frame);
        report.labels = placements.len();

        match self.presenter.present(&self.frame, &placements) {
            Ok(()) => report.rendered = true,
            Err(err) if err.is_fatal() => {
                error!("Halting viewport: {err}");
                self.lifecycle = Lifecycle::Halted(err.clone());
                return Err(ViewportError::Halted(err));
            }
            Err(err) => warn!("Frame {} dropped: {err}", frame.number),
        }

        self.scheduler.request_frame();
        Ok(report)
    }

    /// The host surface changed size, in physical pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = SurfaceSize::new(width, height);
        self.frame.resize(self.surface.width, self.surface.height);
        self.view.camera.set_aspect(self.surface.aspect());
        self.presenter.resize(self.surface.width, self.surface.height);
        debug!("Viewport resized to {}x{}", self.surface.width, self.surface.height);
    }

    /// Tear down the loop; every later call reports `Disposed`
    ///
    /// Pending loads are dropped and a highlighted device is restored first.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.highlight.restore(&mut self.scene);
        self.tweens.clear();
        self.mixins.clear();
        self.composers.clear();
        self.pending.clear();
        self.lifecycle = Lifecycle::Disposed;
        info!("Viewport disposed");
    }

    /// Queue every configured model; each is attached on the tick after it resolves
    pub fn load_models(&mut self, loader: &AssetLoader) {
        let specs = self.config.models.clone();
        for spec in specs {
            self.load_model(loader, spec);
        }
    }

    pub fn load_model(&mut self, loader: &AssetLoader, spec: ModelSpec) {
        let task = loader.load(&spec.url);
        self.pending.push(PendingModel { spec, task });
    }

    /// Models still loading
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Attach a decoded model now and install what its role needs
    pub fn attach_model(&mut self, spec: &ModelSpec, subgraph: SceneSubgraph) -> &AttachedModel {
        let root = self.scene.root();
        let model = self.scene.attach(root, subgraph);

        if let Some(pattern) = &spec.scroll_pattern {
            let matched: Vec<_> = self
                .scene
                .traverse(model.root)
                .into_iter()
                .filter(|id| self.scene.node(*id).is_some_and(|node| node.name.contains(pattern.as_str())))
                .collect();
            let scroll = TextureScroll::for_nodes(&self.scene, &matched);
            if !scroll.is_empty() {
                debug!("Scrolling {} materials of '{}'", scroll.materials().len(), model.name);
                self.mixins.set(format!("scroll:{}", model.name), Box::new(scroll));
            }
        }

        if !model.animations.is_empty() {
            let mixer = AnimationMixer::new(model.animations.clone());
            self.mixins.set(format!("mixer:{}", model.name), Box::new(mixer));
        }

        if spec.role == ModelRole::Devices {
            self.devices = DeviceRegistry::from_model(&self.scene, model.root);
            info!("Registered {} devices from '{}'", self.devices.len(), model.name);
        }

        self.models.push(model);
        &self.models[self.models.len() - 1]
    }

    fn attach_resolved(&mut self, report: &mut TickReport) {
        let pending = std::mem::take(&mut self.pending);
        for mut load in pending {
            match load.task.poll_ready() {
                None => self.pending.push(load),
                Some(Ok(subgraph)) => {
                    let name = self.attach_model(&load.spec, subgraph).name.clone();
                    report.attached.push(name);
                }
                Some(Err(err)) => {
                    warn!("Failed to load {}: {err}", load.spec.url);
                    report.failed_loads.push(load.spec.url);
                }
            }
        }
    }

    /// Run the configured tour from the current camera pose
    pub fn start_tour(
        &mut self,
        on_finish: impl FnOnce(&mut ViewState) + 'static,
    ) -> Result<(), ViewportError> {
        let script = self.script.clone();
        self.start_tour_with(&script, on_finish)
    }

    /// Run `script` from the current camera pose
    ///
    /// The first segment is timed from the next tick, however long the host
    /// waits before ticking.
    pub fn start_tour_with(
        &mut self,
        script: &TourScript,
        on_finish: impl FnOnce(&mut ViewState) + 'static,
    ) -> Result<(), ViewportError> {
        self.ensure_live()?;
        let from = self.view.pose();
        self.tour
            .start(&mut self.tweens, script, from, StartAt::NextUpdate, on_finish)?;
        Ok(())
    }

    /// Cancel the tour and fly home; false when no tour was running
    pub fn stop_tour(&mut self) -> Result<bool, ViewportError> {
        self.ensure_live()?;
        let from = self.view.pose();
        Ok(self.tour.stop(&mut self.tweens, from, StartAt::NextUpdate)?)
    }

    pub fn tour_state(&self) -> TourState {
        self.tour.state()
    }

    /// Start the highlight cycle; false when already running
    pub fn start_warming(&mut self) -> Result<bool, ViewportError> {
        self.ensure_live()?;
        Ok(self.highlight.start())
    }

    /// Stop the highlight cycle, restore the lit device and fly home
    pub fn stop_warming(&mut self) -> Result<bool, ViewportError> {
        self.ensure_live()?;
        let from = self.view.pose();
        let home = self.tour.home();
        Ok(self
            .highlight
            .stop(&mut self.scene, &mut self.tweens, from, home, StartAt::NextUpdate)?)
    }

    /// Meshes under a pixel, nearest first; empty when picking is disabled
    pub fn pick(&self, screen_x: f32, screen_y: f32) -> Vec<PickHit> {
        if !self.flags.enable_picking {
            return Vec::new();
        }
        interaction::pick(&self.scene, &self.view.camera, self.surface, screen_x, screen_y)
    }

    /// Device owning the nearest picked mesh
    pub fn pick_device(&self, screen_x: f32, screen_y: f32) -> Option<usize> {
        self.pick(screen_x, screen_y)
            .iter()
            .find_map(|hit| self.devices.device_of(&self.scene, hit.node))
    }

    /// Orbit by a pointer drag in pixels
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.view
            .controls
            .rotate_pixels(dx, dy, self.surface.height as f32);
    }

    /// Scale the camera distance; above 1 moves away from the target
    pub fn dolly(&mut self, scale: f32) {
        self.view.controls.dolly(scale);
    }

    /// Register a mixin; an existing one under `key` is replaced
    pub fn set_mixin(&mut self, key: impl Into<String>, mixin: impl RenderMixin + 'static) {
        self.mixins.set(key, Box::new(mixin));
    }

    pub fn delete_mixin(&mut self, key: &str) -> bool {
        self.mixins.delete(key).is_some()
    }

    pub fn mixin_keys(&self) -> Vec<&str> {
        self.mixins.keys().collect()
    }

    /// Register a composer; an existing one under `key` is replaced
    pub fn set_composer(&mut self, key: impl Into<String>, composer: impl Composer + 'static) {
        self.composers.set(key, Box::new(composer));
    }

    pub fn delete_composer(&mut self, key: &str) -> bool {
        self.composers.delete(key).is_some()
    }

    pub fn labels_mut(&mut self) -> &mut LabelOverlay {
        &mut self.labels
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn camera_pose(&self) -> CameraPose {
        self.view.pose()
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn highlight(&self) -> &HighlightCycle {
        &self.highlight
    }

    pub fn models(&self) -> &[AttachedModel] {
        &self.models
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn flags(&self) -> EngineFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut EngineFlags {
        &mut self.flags
    }

    fn ensure_live(&self) -> Result<(), ViewportError> {
        if self.lifecycle == Lifecycle::Disposed {
            return Err(ViewportError::Disposed);
        }
        Ok(())
    }
}

/// Ground plane and ambient light every viewport starts with
fn build_scenery(scene: &mut SceneGraph, config: &ViewportConfig) {
    let root = scene.root();
    let ground = &config.ground;
    if ground.enabled {
        let material = scene.materials.add(
            Material::new("ground", ground.color)
                .with_map(TextureSlot::new(Vec2::splat(ground.repeat)))
                .unlit(),
        );
        let half = ground.size * 0.5;
        scene.add_node(
            root,
            "ground",
            NodeKind::Mesh {
                bounds: AABB::new(Vec3::new(-half, 0.0, -half), Vec3::new(half, 0.0, half)),
                material,
            },
            Transform::from_translation(Vec3::new(0.0, ground.height, 0.0)),
        );
    }
    scene.add_node(
        root,
        "ambient",
        NodeKind::Light(AmbientLight {
            color: config.ambient.color,
            intensity: config.ambient.intensity,
        }),
        Transform::IDENTITY,
    );
}

/// Run one callback, turning an error or a panic into a logged failure
fn isolate(
    kind: CallbackKind,
    key: &str,
    run: impl FnOnce() -> anyhow::Result<()>,
) -> Option<CallbackFailure> {
    let message = match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(())) => return None,
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => panic_message(payload.as_ref()),
    };
    let failure = CallbackFailure {
        kind,
        key: key.to_string(),
        message,
    };
    warn!("{failure}");
    Some(failure)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panicked".to_string()
    }
}
