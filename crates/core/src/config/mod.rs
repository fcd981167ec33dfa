use serde::{Deserialize, Serialize};

use crate::{
    scene::{is_empty_scene, Rgba, SceneConfig, SurfaceSize, EMPTY_SCENE},
    Result, SlotDeckError, SLOT_COUNT,
};

/// Top-level configuration structure for the application.
///
/// This is also the persisted settings snapshot: slot assignments, the current
/// slot and every tunable parameter. Parsing goes through
/// [`AppConfig::from_json_str`], which validates the whole document before
/// handing anything back, so callers never apply a half-valid snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub transition: TransitionConfig,
    pub visual: VisualConfig,
    pub render: RenderConfig,
    pub slots: Vec<String>,
    pub current_slot: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            transition: TransitionConfig::default(),
            visual: VisualConfig::default(),
            render: RenderConfig::default(),
            slots: vec![
                "pulsing_polygon".to_string(),
                "spectrum_bars".to_string(),
                "particle_burst".to_string(),
                EMPTY_SCENE.to_string(),
                EMPTY_SCENE.to_string(),
            ],
            current_slot: 0,
        }
    }
}

impl AppConfig {
    /// Parses and validates a settings document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every section, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.slots.len() != SLOT_COUNT {
            return Err(SlotDeckError::InvalidConfig(format!(
                "expected {SLOT_COUNT} slot assignments, found {}",
                self.slots.len()
            )));
        }
        if self.current_slot >= SLOT_COUNT {
            return Err(SlotDeckError::InvalidConfig(format!(
                "current slot {} is out of range",
                self.current_slot
            )));
        }
        if is_empty_scene(&self.slots[self.current_slot]) {
            return Err(SlotDeckError::InvalidConfig(format!(
                "current slot {} has no scene assigned",
                self.current_slot
            )));
        }
        self.audio.validate()?;
        self.transition.validate()?;
        self.visual.validate()?;
        self.render.validate()
    }

    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            foreground: self.visual.foreground,
            background: self.visual.background,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Samples per analysis window. Must be a power of two.
    pub fft_size: usize,
    /// Per-bin temporal smoothing in `[0, 1)`.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Gain applied to every band energy before clamping.
    pub sensitivity: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 256,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            sensitivity: 1.0,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be positive"));
        }
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(invalid("audio.fft_size must be a power of two of at least 32"));
        }
        if !self.smoothing.is_finite() || !(0.0..1.0).contains(&self.smoothing) {
            return Err(invalid("audio.smoothing must lie in [0, 1)"));
        }
        if !self.min_decibels.is_finite()
            || !self.max_decibels.is_finite()
            || self.min_decibels >= self.max_decibels
        {
            return Err(invalid("audio.min_decibels must be below audio.max_decibels"));
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(invalid("audio.sensitivity must be a non-negative number"));
        }
        Ok(())
    }
}

/// Crossfade and auto-advance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Crossfade length. Zero switches on the next tick.
    pub duration_seconds: f32,
    pub auto_switch: bool,
    pub auto_interval_seconds: f32,
    /// Auto-advance picks a random available slot instead of the next one.
    pub random_order: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.5,
            auto_switch: false,
            auto_interval_seconds: 10.0,
            random_order: false,
        }
    }
}

impl TransitionConfig {
    fn validate(&self) -> Result<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(invalid("transition.duration_seconds must be a non-negative number"));
        }
        if !self.auto_interval_seconds.is_finite() || self.auto_interval_seconds <= 0.0 {
            return Err(invalid("transition.auto_interval_seconds must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub foreground: Rgba,
    pub background: Rgba,
    pub strobe_enabled: bool,
    /// Bass attack that fires the strobe.
    pub strobe_threshold: f32,
    /// Peak opacity of the strobe flash.
    pub strobe_alpha: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            foreground: Rgba::WHITE,
            background: Rgba::BLACK,
            strobe_enabled: true,
            strobe_threshold: 0.15,
            strobe_alpha: 0.5,
        }
    }
}

impl VisualConfig {
    fn validate(&self) -> Result<()> {
        if !self.strobe_threshold.is_finite() || self.strobe_threshold < 0.0 {
            return Err(invalid("visual.strobe_threshold must be a non-negative number"));
        }
        if !self.strobe_alpha.is_finite() || !(0.0..=1.0).contains(&self.strobe_alpha) {
            return Err(invalid("visual.strobe_alpha must lie in [0, 1]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            fps: 60,
        }
    }
}

impl RenderConfig {
    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("render.width and render.height must be positive"));
        }
        if self.fps == 0 {
            return Err(invalid("render.fps must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> SlotDeckError {
    SlotDeckError::InvalidConfig(message.to_string())
}
