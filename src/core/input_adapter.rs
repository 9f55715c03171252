use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Pointer buttons the viewport reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pixels a press may travel and still count as a click
const CLICK_SLOP: f32 = 4.0;

/// Pointer activity gathered since the previous frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerFrame {
    /// Cursor travel while the primary button was held
    pub drag: (f32, f32),
    /// Wheel lines; positive scrolls up
    pub scroll: f32,
    /// Click positions in window pixels
    pub clicks: Vec<(f32, f32)>,
}

/// Adapter that turns winit window events into orbit and picking input
#[derive(Debug, Clone, Default)]
pub struct PointerInput {
    pressed: HashSet<PointerButton>,
    position: Option<(f32, f32)>,
    press_origin: Option<(f32, f32)>,
    frame: PointerFrame,
}

impl PointerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a winit WindowEvent and update internal state
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = Self::map_button(*button) else {
                    return;
                };
                match state {
                    ElementState::Pressed => {
                        self.pressed.insert(button);
                        if button == PointerButton::Primary {
                            self.press_origin = self.position;
                        }
                    }
                    ElementState::Released => {
                        self.pressed.remove(&button);
                        if button == PointerButton::Primary {
                            self.finish_press();
                        }
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.move_to(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.position = None;
                self.press_origin = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.frame.scroll += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
            }
            _ => {}
        }
    }

    pub fn is_down(&self, button: PointerButton) -> bool {
        self.pressed.contains(&button)
    }

    /// Current cursor position (if inside the window)
    pub fn position(&self) -> Option<(f32, f32)> {
        self.position
    }

    /// Hand out the activity gathered since the last call
    pub fn take_frame(&mut self) -> PointerFrame {
        std::mem::take(&mut self.frame)
    }

    fn move_to(&mut self, x: f32, y: f32) {
        if let Some((old_x, old_y)) = self.position {
            if self.is_down(PointerButton::Primary) {
                self.frame.drag.0 += x - old_x;
                self.frame.drag.1 += y - old_y;
            }
        }
        self.position = Some((x, y));
    }

    fn finish_press(&mut self) {
        if let (Some(origin), Some(release)) = (self.press_origin.take(), self.position) {
            let travel = ((release.0 - origin.0).powi(2) + (release.1 - origin.1).powi(2)).sqrt();
            if travel <= CLICK_SLOP {
                self.frame.clicks.push(release);
            }
        }
    }

    fn map_button(button: MouseButton) -> Option<PointerButton> {
        match button {
            MouseButton::Left => Some(PointerButton::Primary),
            MouseButton::Right => Some(PointerButton::Secondary),
            _ => None,
        }
    }
}
