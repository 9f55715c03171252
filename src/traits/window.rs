use std::sync::Arc;

use winit::window::Window;

/// The host's per-frame callback: asks for one more tick
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

impl FrameScheduler for Arc<Window> {
    fn request_frame(&mut self) {
        self.request_redraw();
    }
}

/// Scheduler for headless use; counts requests
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualScheduler {
    pub requested: u64,
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.requested += 1;
    }
}
