/// Repeating interval timer - accumulates frame deltas and fires every period
/// Stands in for `setInterval` on the tick thread
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period_ms: f64,
    accumulated_ms: f64,
    running: bool,
}

impl Interval {
    /// Create a stopped timer that fires every `period_ms` once started
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(1.0),
            accumulated_ms: 0.0,
            running: false,
        }
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start counting from zero; the first fire happens one period later
    pub fn start(&mut self) {
        self.accumulated_ms = 0.0;
        self.running = true;
    }

    /// Clear the timer
    pub fn stop(&mut self) {
        self.accumulated_ms = 0.0;
        self.running = false;
    }

    /// Update with delta, returns true if the period elapsed
    /// Fires at most once per call; a long stall does not replay missed periods
    pub fn tick(&mut self, delta_ms: f64) -> bool {
        if !self.running {
            return false;
        }

        self.accumulated_ms += delta_ms.max(0.0);

        if self.accumulated_ms >= self.period_ms {
            self.accumulated_ms = (self.accumulated_ms - self.period_ms) % self.period_ms;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_every_period() {
        let mut timer = Interval::new(100.0);
        timer.start();

        assert!(!timer.tick(60.0));
        assert!(timer.tick(60.0)); // 120ms total
        assert!(!timer.tick(60.0)); // 80ms carried
        assert!(timer.tick(30.0));
    }

    #[test]
    fn stopped_interval_never_fires() {
        let mut timer = Interval::new(50.0);
        assert!(!timer.tick(500.0));

        timer.start();
        timer.stop();
        assert!(!timer.tick(500.0));
        assert!(!timer.is_running());
    }

    #[test]
    fn long_stall_fires_once() {
        let mut timer = Interval::new(100.0);
        timer.start();

        assert!(timer.tick(1050.0));
        assert!(!timer.tick(10.0));
    }
}
