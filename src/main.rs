use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use substation_viewport::cli::Cli;
use substation_viewport::config::ViewportConfig;
use substation_viewport::core::{Clock, PointerInput, SurfaceSize, WindowPresenter};
use substation_viewport::loaders::AssetLoader;
use substation_viewport::render::{OutputEncoding, PassComposer, RaycastRenderer, SrgbEncodePass};
use substation_viewport::{ViewportEngine, ViewportError};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const INITIAL_WINDOW_WIDTH: u32 = 1280;
const INITIAL_WINDOW_HEIGHT: u32 = 720;
/// Camera distance factor per wheel line
const DOLLY_STEP: f32 = 0.95;

struct App {
    cli: Cli,
    config: ViewportConfig,
    window: Option<Arc<Window>>,
    engine: Option<ViewportEngine>,
    input: PointerInput,
    clock: Clock,
}

impl App {
    fn new(cli: Cli, config: ViewportConfig) -> Self {
        Self {
            cli,
            config,
            window: None,
            engine: None,
            input: PointerInput::new(),
            clock: Clock::new(),
        }
    }

    fn create_engine(&self, window: Arc<Window>) -> anyhow::Result<ViewportEngine> {
        let size = window.inner_size();
        let presenter = WindowPresenter::new(window.clone())?;
        let mut engine = ViewportEngine::new(
            self.config.clone(),
            SurfaceSize::new(size.width, size.height),
            window,
            presenter,
        )?;

        if self.cli.composers {
            let base = RaycastRenderer::new(
                self.config.clear_color,
                self.config.clear_alpha,
                self.config.preview_scale,
            )
            .with_encoding(OutputEncoding::Linear);
            engine.set_composer("output", PassComposer::new(base).add_pass(SrgbEncodePass::default()));
        }

        engine.load_models(&AssetLoader::new(self.config.asset_root.clone()));
        engine.start()?;

        if self.cli.auto_tour {
            engine.start_tour(|_| info!("Tour finished"))?;
        }
        Ok(engine)
    }

    fn handle_key(&mut self, key: KeyCode) {
        let Some(engine) = &mut self.engine else {
            return;
        };
        let result = match key {
            KeyCode::KeyT => engine.start_tour(|_| info!("Tour finished")).map(|_| true),
            KeyCode::KeyY => engine.stop_tour(),
            KeyCode::KeyH => engine.start_warming(),
            KeyCode::KeyJ => engine.stop_warming(),
            _ => return,
        };
        match result {
            Ok(true) => {}
            Ok(false) => info!("{key:?}: nothing to do"),
            Err(e) => warn!("{key:?} failed: {e}"),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = &mut self.engine else {
            return;
        };

        let pointer = self.input.take_frame();
        if pointer.drag != (0.0, 0.0) {
            engine.orbit(pointer.drag.0, pointer.drag.1);
        }
        if pointer.scroll != 0.0 {
            engine.dolly(DOLLY_STEP.powf(pointer.scroll));
        }
        for (x, y) in pointer.clicks {
            match engine.pick_device(x, y).and_then(|index| engine.devices().get(index)) {
                Some(device) => info!("Picked device '{}'", device.name),
                None => info!("Nothing picked at ({x:.0}, {y:.0})"),
            }
        }

        match engine.tick(self.clock.now_ms()) {
            Ok(report) => {
                for name in &report.attached {
                    info!("Model '{name}' attached");
                }
            }
            Err(ViewportError::Halted(e)) => {
                error!("Viewport halted: {e}");
                event_loop.exit();
            }
            Err(e) => error!("Tick failed: {e}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            Window::default_attributes()
                .with_title("Substation Viewport")
                .with_inner_size(winit::dpi::LogicalSize::new(
                    INITIAL_WINDOW_WIDTH,
                    INITIAL_WINDOW_HEIGHT,
                )),
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.create_engine(window.clone()) {
            Ok(engine) => self.engine = Some(engine),
            Err(e) => {
                error!("Failed to initialize viewport: {e:#}");
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                if let Some(engine) = &mut self.engine {
                    engine.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(key),
            WindowEvent::Resized(size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.viewport_config()?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, config);

    info!("Substation viewport - T/Y start/stop tour, H/J start/stop warming, drag to orbit, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
