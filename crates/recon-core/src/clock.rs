use std::time::Instant;

/// Process-wide frame timer, owned by the host loop and passed down explicitly.
///
/// `tick` returns the seconds since the previous tick; the first tick measures from `start`.
/// After `stop` the clock is frozen: ticks report 0 and `elapsed` no longer advances.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame: u64,
    stopped: bool,
}

impl FrameClock {
    pub fn start(now: Instant) -> Self {
        Self {
            start: now,
            last: now,
            frame: 0,
            stopped: false,
        }
    }

    pub fn tick(&mut self, now: Instant) -> f32 {
        if self.stopped {
            return 0.0;
        }
        // `saturating_duration_since` keeps a non-monotonic `now` from going negative.
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        self.frame += 1;
        dt
    }

    /// Seconds between `start` and the latest tick.
    pub fn elapsed(&self) -> f32 {
        self.last.saturating_duration_since(self.start).as_secs_f32()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Freeze the clock at `now`. Returns total seconds run; later calls return the same value.
    pub fn stop(&mut self, now: Instant) -> f32 {
        if !self.stopped {
            self.last = now.max(self.last);
            self.stopped = true;
        }
        self.elapsed()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_reports_delta_since_previous_tick() {
        let t0 = Instant::now();
        let mut clock = FrameClock::start(t0);

        let dt1 = clock.tick(t0 + Duration::from_millis(16));
        let dt2 = clock.tick(t0 + Duration::from_millis(50));

        assert!((dt1 - 0.016).abs() < 1e-6);
        assert!((dt2 - 0.034).abs() < 1e-6);
        assert!((clock.elapsed() - 0.050).abs() < 1e-6);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn going_backwards_yields_zero_delta() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::start(t0);
        assert_eq!(clock.tick(t0 - Duration::from_millis(5)), 0.0);
    }

    #[test]
    fn stopped_clock_is_frozen() {
        let t0 = Instant::now();
        let mut clock = FrameClock::start(t0);
        clock.tick(t0 + Duration::from_millis(100));

        let total = clock.stop(t0 + Duration::from_millis(250));
        assert!((total - 0.25).abs() < 1e-6);
        assert!(!clock.is_running());

        assert_eq!(clock.tick(t0 + Duration::from_secs(3)), 0.0);
        assert_eq!(clock.frame(), 1);
        assert_eq!(clock.stop(t0 + Duration::from_secs(5)), total);
        assert!((clock.elapsed() - 0.25).abs() < 1e-6);
    }
}
