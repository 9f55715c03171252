pub mod clock;
pub mod frame_buffer;
pub mod gpu_context;
pub mod input_adapter;
pub mod presenter;
pub mod registry;
pub mod surface;
pub mod timer;

pub use clock::Clock;
pub use frame_buffer::{DrawOp, FrameBuffer, Rgba};
pub use gpu_context::GpuContext;
pub use input_adapter::{PointerButton, PointerFrame, PointerInput};
pub use presenter::WindowPresenter;
pub use registry::KeyedRegistry;
pub use surface::SurfaceSize;
pub use timer::Interval;
