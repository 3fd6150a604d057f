use std::time::{Duration, Instant};

/// Timing of one presented frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Sum of every clamped `dt` so far. Stalls (debugger, minimized window)
    /// only ever add `dt_max`, so animation resumes where it left off.
    pub elapsed: f64,

    pub now: Instant,

    pub frame_index: u64,
}

/// Per-window frame clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        self.advance(now.saturating_duration_since(self.last), now)
    }

    fn advance(&mut self, raw: Duration, now: Instant) -> FrameTime {
        let dt = raw.clamp(self.dt_min, self.dt_max);
        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalls_are_clamped_and_accumulated() {
        let mut c = FrameClock::new();
        let now = Instant::now();
        let a = c.advance(Duration::from_millis(16), now);
        let b = c.advance(Duration::from_secs(5), now);
        let z = c.advance(Duration::ZERO, now);

        assert!((a.dt - 0.016).abs() < 1e-6);
        assert!((b.dt - 0.25).abs() < 1e-6);
        assert!((z.dt - 0.0001).abs() < 1e-7);
        assert!((z.elapsed - 0.2661).abs() < 1e-9);
        assert_eq!((a.frame_index, b.frame_index, z.frame_index), (0, 1, 2));
    }
}
