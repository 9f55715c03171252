/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    /// Host timestamp of this tick in milliseconds
    pub time_ms: f64,
    /// Seconds since the previous tick (0 on the first)
    pub delta_secs: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time_ms: f64, delta_secs: f32) -> Self {
        Self {
            number,
            time_ms,
            delta_secs,
        }
    }

    pub fn delta_ms(&self) -> f64 {
        self.delta_secs as f64 * 1000.0
    }
}

/// Turns host timestamps into numbered frames
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frame_number: u64,
    last_time_ms: Option<f64>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Produce the frame for a tick at `now_ms`
    ///
    /// Timestamps that go backwards yield a zero delta.
    pub fn advance(&mut self, now_ms: f64) -> FrameInfo {
        let delta_ms = match self.last_time_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };

        let info = FrameInfo::new(self.frame_number, now_ms, (delta_ms / 1000.0) as f32);

        self.frame_number += 1;
        self.last_time_ms = Some(now_ms);

        info
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
