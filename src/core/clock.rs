use std::time::Instant;

/// Monotonic wall clock handing out milliseconds since creation
/// The tick loop and the tween engine share this time base
#[derive(Debug)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the clock started
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Restart the time base at zero
    pub fn reset(&mut self) {
        self.origin = Instant::now();
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
