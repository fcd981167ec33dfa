use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{render::Surface, AudioFeatureFrame, Result, SlotDeckError};

/// Reserved slot assignment meaning "no scene in this slot".
pub const EMPTY_SCENE: &str = "empty";

/// Returns `true` when `name` is the reserved empty-slot marker.
pub fn is_empty_scene(name: &str) -> bool {
    name.is_empty() || name.eq_ignore_ascii_case(EMPTY_SCENE)
}

/// 8-bit RGBA color. Serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parses `#rgb`-style hex strings with six or eight digits.
    pub fn from_hex(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() != 6 && digits.len() != 8 {
            return Err(SlotDeckError::InvalidConfig(format!(
                "color `{value}` must have 6 or 8 hex digits"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|part| u8::from_str_radix(part, 16).ok())
                .ok_or_else(|| SlotDeckError::InvalidConfig(format!("color `{value}` is not hex")))
        };
        let a = if digits.len() == 8 { channel(6..8)? } else { 255 };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
            a,
        })
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scales the RGB channels by `factor` (clamped to `[0, 1]`).
    pub fn scaled(self, factor: f32) -> Self {
        let f = if factor.is_finite() { factor.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            r: (self.r as f32 * f) as u8,
            g: (self.g as f32 * f) as u8,
            b: (self.b as f32 * f) as u8,
            a: self.a,
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl TryFrom<String> for Rgba {
    type Error = SlotDeckError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Pixel dimensions of the surface a scene is built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Shared configuration handed to every scene factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub foreground: Rgba,
    pub background: Rgba,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            foreground: Rgba::WHITE,
            background: Rgba::BLACK,
        }
    }
}

/// Identifies one realized scene instance: the slot that owns it plus the
/// slot generation it was installed under. Reassigning a slot bumps the
/// generation, so keys of disposed instances never alias live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneKey {
    pub slot: usize,
    pub generation: u64,
}

impl SceneKey {
    pub const fn new(slot: usize, generation: u64) -> Self {
        Self { slot, generation }
    }
}

/// Capability contract every pluggable visual program implements.
///
/// A scene is either visible or hidden. Hidden scenes are neither updated nor
/// drawn by the orchestration layer, although the object stays alive until
/// [`VisualScene::dispose`] is called.
pub trait VisualScene: Send {
    /// Catalog name the instance was created from.
    fn name(&self) -> &str;

    /// Advances the scene by one frame. The frame is shared with every other
    /// scene updated this tick and must not be retained by reference.
    fn update(&mut self, frame: &AudioFeatureFrame, elapsed: f32);

    /// Makes the scene visible. Calling it twice is the same as calling it once.
    fn show(&mut self);

    /// Hides the scene. Calling it twice is the same as calling it once.
    fn hide(&mut self);

    fn is_visible(&self) -> bool;

    /// Draws the scene into whichever surface the compositor designates.
    fn render(&self, target: &mut Surface);

    /// Optional capability. Scenes without a tintable foreground keep the
    /// default no-op.
    fn update_foreground_color(&mut self, _color: Rgba) {}

    /// Releases everything the instance owns. The instance is not updated or
    /// shown afterwards.
    fn dispose(&mut self);
}

impl fmt::Debug for dyn VisualScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualScene")
            .field("name", &self.name())
            .field("visible", &self.is_visible())
            .finish()
    }
}
