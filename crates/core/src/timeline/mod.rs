/// Timing of one render-loop tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub delta: f32,
}

impl FrameTime {
    pub fn new(elapsed: f32, delta: f32) -> Self {
        Self { elapsed, delta }
    }
}

/// Accumulates per-tick deltas into a monotonic elapsed time.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    pub time_seconds: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    /// Advances by `delta` seconds. Negative or non-finite deltas count as 0.
    pub fn tick(&mut self, delta: f32) -> FrameTime {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.time_seconds += delta;
        FrameTime::new(self.time_seconds, delta)
    }
}

/// Decides which ticks of a faster host loop should render, so output runs
/// at a fixed target rate.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: f32,
    accumulated: f32,
}

impl FramePacer {
    pub fn new(fps: f32) -> Self {
        let mut pacer = Self {
            interval: 1.0 / 60.0,
            accumulated: 0.0,
        };
        pacer.set_fps(fps);
        pacer
    }

    /// Non-positive or non-finite rates are ignored.
    pub fn set_fps(&mut self, fps: f32) {
        if fps.is_finite() && fps > 0.0 {
            self.interval = 1.0 / fps;
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Adds `delta` seconds and reports whether a frame is due. Backlog beyond
    /// one interval is dropped rather than replayed.
    pub fn should_render(&mut self, delta: f32) -> bool {
        if delta.is_finite() && delta > 0.0 {
            self.accumulated += delta;
        }
        if self.accumulated + f32::EPSILON < self.interval {
            return false;
        }
        self.accumulated = (self.accumulated - self.interval).min(self.interval);
        true
    }
}
