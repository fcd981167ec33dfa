use crate::{scene::Rgba, AudioFeatureFrame, VisualConfig};

use super::{surface::lerp_u8, Surface};

/// How quickly a flash fades out, in flashes per second.
const STROBE_DECAY: f32 = 6.0;
/// Idle timer value; far enough from zero that no flash is visible.
const STROBE_IDLE: f32 = 100.0;

/// Full-frame flash fired by strong bass onsets.
#[derive(Debug, Clone, PartialEq)]
pub struct StrobePass {
    enabled: bool,
    color: Rgba,
    alpha: f32,
    threshold: f32,
    since_trigger: f32,
}

impl Default for StrobePass {
    fn default() -> Self {
        Self::from_config(&VisualConfig::default())
    }
}

impl StrobePass {
    pub fn from_config(config: &VisualConfig) -> Self {
        let mut pass = Self {
            enabled: false,
            color: Rgba::WHITE,
            alpha: 0.0,
            threshold: 0.0,
            since_trigger: STROBE_IDLE,
        };
        pass.configure(config);
        pass
    }

    pub fn configure(&mut self, config: &VisualConfig) {
        self.enabled = config.strobe_enabled;
        self.color = config.foreground;
        self.alpha = config.strobe_alpha.clamp(0.0, 1.0);
        self.threshold = config.strobe_threshold.max(0.0);
        if !self.enabled {
            self.since_trigger = STROBE_IDLE;
        }
    }

    /// Restarts the flash.
    pub fn trigger(&mut self) {
        if self.enabled {
            self.since_trigger = 0.0;
        }
    }

    /// Ages the current flash and fires a new one on a strong bass attack.
    pub fn update(&mut self, frame: &AudioFeatureFrame, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.since_trigger = (self.since_trigger + delta).min(STROBE_IDLE);
        }
        if frame.bass_attack > self.threshold {
            self.trigger();
        }
    }

    /// Current flash opacity in `[0, alpha]`.
    pub fn strength(&self) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        (1.0 - self.since_trigger * STROBE_DECAY).max(0.0) * self.alpha
    }

    pub fn apply(&self, surface: &mut Surface) {
        let strength = self.strength();
        if strength <= 0.0 {
            return;
        }
        let color = [self.color.r, self.color.g, self.color.b];
        for px in surface.pixels_mut().chunks_exact_mut(4) {
            for (channel, target) in px.iter_mut().zip(color) {
                *channel = lerp_u8(*channel, target, strength);
            }
        }
    }
}
