pub mod camera;
pub mod cli;
pub mod config;
pub mod controls;
pub mod core;
pub mod error;
pub mod frame;
pub mod interaction;
pub mod loaders;
pub mod math;
pub mod render;
pub mod scene;
pub mod tour;
pub mod traits;
pub mod tween;
pub mod viewport;

pub use camera::{CameraPose, PerspectiveCamera, ViewState};
pub use config::{EngineFlags, ViewportConfig};
pub use error::{CallbackFailure, LoadError, RenderError, TourError, TweenError, ViewportError};
pub use tour::{CameraTour, TourScript, TourState, Waypoint};
pub use viewport::{TickReport, ViewportEngine};
