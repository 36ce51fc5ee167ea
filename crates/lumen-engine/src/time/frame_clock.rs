use std::time::{Duration, Instant};

/// Timing of one rendered frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started.
    pub elapsed: f32,
    pub index: u64,
}

/// Produces one [`FrameTime`] per rendered frame.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// produce a huge step in animations.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    index: u64,
    min_dt: Duration,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_limits(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_limits(min_dt: Duration, max_dt: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            index: 0,
            min_dt: min_dt.min(max_dt),
            max_dt,
        }
    }

    /// Restarts delta measurement, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.min_dt, self.max_dt);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            index: self.index,
        };
        self.index = self.index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponentially smoothed frames per second.
#[derive(Debug, Copy, Clone, Default)]
pub struct FpsCounter {
    fps: Option<f32>,
}

impl FpsCounter {
    const SMOOTHING: f32 = 0.1;

    pub fn record(&mut self, time: &FrameTime) -> f32 {
        let sample = 1.0 / time.dt.max(f32::EPSILON);
        let fps = match self.fps {
            Some(prev) => prev + (sample - prev) * Self::SMOOTHING,
            None => sample,
        };
        self.fps = Some(fps);
        fps
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps.unwrap_or(0.0)
    }
}
