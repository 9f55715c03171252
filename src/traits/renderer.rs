use crate::core::frame_buffer::FrameBuffer;
use crate::error::RenderError;
use crate::render::LabelPlacement;

/// Puts a finished frame and its label text on screen
pub trait FramePresenter {
    fn present(&mut self, frame: &FrameBuffer, labels: &[LabelPlacement]) -> Result<(), RenderError>;

    /// Surface size changed, in physical pixels
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Presenter that keeps the last frame in memory
#[derive(Debug, Default, Clone)]
pub struct OffscreenPresenter {
    pub presented: u64,
    pub last_frame: Option<FrameBuffer>,
    pub last_labels: Vec<LabelPlacement>,
}

impl FramePresenter for OffscreenPresenter {
    fn present(&mut self, frame: &FrameBuffer, labels: &[LabelPlacement]) -> Result<(), RenderError> {
        self.presented += 1;
        self.last_frame = Some(frame.clone());
        self.last_labels = labels.to_vec();
        Ok(())
    }
}
