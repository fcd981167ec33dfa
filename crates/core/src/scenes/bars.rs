use crate::{
    render::Surface,
    scene::{Rgba, SceneConfig, SurfaceSize, VisualScene},
    AudioFeatureFrame,
};

use super::SPECTRUM_BARS;

const BAR_COUNT: usize = 32;
/// Per-frame fall-off applied to bars whose input dropped.
const FALL_OFF: f32 = 0.85;

/// Vertical bars built from the frame's normalised spectrum.
#[derive(Debug)]
pub struct SpectrumBars {
    color: Rgba,
    levels: [f32; BAR_COUNT],
    visible: bool,
    disposed: bool,
}

impl SpectrumBars {
    pub fn new(_size: SurfaceSize, config: &SceneConfig) -> Self {
        Self {
            color: config.foreground,
            levels: [0.0; BAR_COUNT],
            visible: false,
            disposed: false,
        }
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }
}

/// Averages `spectrum` into `BAR_COUNT` buckets. Missing bins read as 0.
fn bucket(spectrum: &[f32], index: usize) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }
    let start = index * spectrum.len() / BAR_COUNT;
    let end = ((index + 1) * spectrum.len() / BAR_COUNT).max(start + 1);
    let Some(bins) = spectrum.get(start..end.min(spectrum.len())) else {
        return 0.0;
    };
    if bins.is_empty() {
        return 0.0;
    }
    let sum: f32 = bins.iter().filter(|v| v.is_finite()).sum();
    (sum / bins.len() as f32).clamp(0.0, 1.0)
}

impl VisualScene for SpectrumBars {
    fn name(&self) -> &str {
        SPECTRUM_BARS
    }

    fn update(&mut self, frame: &AudioFeatureFrame, _elapsed: f32) {
        if self.disposed {
            return;
        }
        for (index, level) in self.levels.iter_mut().enumerate() {
            let target = bucket(&frame.spectrum, index);
            *level = target.max(*level * FALL_OFF);
        }
    }

    fn show(&mut self) {
        self.visible = !self.disposed;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn render(&self, target: &mut Surface) {
        if !self.visible {
            return;
        }
        let width = target.width();
        let height = target.height();
        let slot = (width / BAR_COUNT as u32).max(1);
        let bar = slot.saturating_sub(1).max(1);
        for (index, level) in self.levels.iter().enumerate() {
            let bar_height = (level * height as f32).round() as u32;
            if bar_height == 0 {
                continue;
            }
            let x = index as i64 * slot as i64;
            let y = height as i64 - bar_height as i64;
            target.fill_rect(x, y, bar, bar_height, self.color);
        }
    }

    fn update_foreground_color(&mut self, color: Rgba) {
        self.color = color;
    }

    fn dispose(&mut self) {
        self.visible = false;
        self.disposed = true;
    }
}
