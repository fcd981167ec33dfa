use crate::SceneKey;

/// Owns the single crossfade that may be in flight.
///
/// `Idle -> Active -> Idle`. The controller only tracks how far along the
/// fade is; committing the destination slot once [`Self::is_complete`]
/// reports `true` is left to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionController {
    active: bool,
    progress: f32,
    from: Option<SceneKey>,
    to: Option<SceneKey>,
    target_slot: Option<usize>,
}

impl TransitionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a fade from `from` to `to`. Returns `false` without touching
    /// any state when a fade is already running, either scene is missing, or
    /// both keys name the same instance.
    pub fn start(
        &mut self,
        from: Option<SceneKey>,
        to: Option<SceneKey>,
        target_slot: usize,
    ) -> bool {
        let (Some(from), Some(to)) = (from, to) else {
            return false;
        };
        if self.active || from == to {
            return false;
        }

        self.active = true;
        self.progress = 0.0;
        self.from = Some(from);
        self.to = Some(to);
        self.target_slot = Some(target_slot);
        true
    }

    /// Advances the fade by `delta` seconds of a `duration` second fade.
    ///
    /// Progress never exceeds `1.0`. A non-positive or non-finite duration
    /// completes the fade at once; negative or non-finite deltas are ignored.
    pub fn update(&mut self, delta: f32, duration: f32) {
        if !self.active {
            return;
        }

        if !(duration.is_finite() && duration > 0.0) {
            self.progress = 1.0;
            return;
        }

        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.progress = (self.progress + delta / duration).min(1.0);
    }

    /// Returns to idle. Harmless when already idle.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.active && self.progress >= 1.0
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn from(&self) -> Option<SceneKey> {
        self.from
    }

    pub fn to(&self) -> Option<SceneKey> {
        self.to
    }

    pub fn target_slot(&self) -> Option<usize> {
        self.target_slot
    }

    /// `(from, to, progress)` while a fade is running.
    pub fn view(&self) -> Option<(SceneKey, SceneKey, f32)> {
        match (self.active, self.from, self.to) {
            (true, Some(from), Some(to)) => Some((from, to, self.progress)),
            _ => None,
        }
    }
}
