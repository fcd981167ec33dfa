//! Reduction of a magnitude spectrum into the per-frame band features that
//! drive every scene.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Largest magnitude a byte spectrum bin can carry.
const BYTE_BIN_MAX: f32 = 255.0;

/// Features for a single frame. Built fresh every tick and never mutated
/// afterwards; scenes receive it by shared reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureFrame {
    /// Normalised, sensitivity scaled band energies in `[0, 1]`.
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Rectified rise of each band since the previous frame.
    pub bass_attack: f32,
    pub mid_attack: f32,
    pub treble_attack: f32,
    /// Per-bin magnitudes normalised to `[0, 1]`. Empty when the extractor
    /// was configured without spectrum snapshots.
    #[serde(default)]
    pub spectrum: Vec<f32>,
}

impl AudioFeatureFrame {
    /// A frame with every energy and attack at zero.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn energies(&self) -> [f32; 3] {
        [self.bass, self.mid, self.treble]
    }

    pub fn attacks(&self) -> [f32; 3] {
        [self.bass_attack, self.mid_attack, self.treble_attack]
    }
}

/// Proportional split of the spectrum into bass, mid and treble ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLayout {
    /// Share of bins that belong to the bass band.
    pub low: f32,
    /// Share of bins that belong to the mid band; treble takes the rest.
    pub mid: f32,
}

impl Default for BandLayout {
    fn default() -> Self {
        Self { low: 0.1, mid: 0.2 }
    }
}

impl BandLayout {
    /// Contiguous, non-overlapping index ranges for a spectrum of `bins`
    /// entries. Every range is non-empty once `bins >= 3`.
    pub fn ranges(&self, bins: usize) -> [Range<usize>; 3] {
        let low_share = sanitize_share(self.low);
        let mid_share = sanitize_share(self.mid);

        let mut low_end = (bins as f32 * low_share).floor() as usize;
        let mut mid_end = (bins as f32 * (low_share + mid_share).min(1.0)).floor() as usize;

        if bins >= 3 {
            low_end = low_end.clamp(1, bins - 2);
            mid_end = mid_end.clamp(low_end + 1, bins - 1);
        } else {
            low_end = bins.min(1);
            mid_end = bins.min(2);
        }

        [0..low_end, low_end..mid_end, mid_end..bins]
    }
}

fn sanitize_share(share: f32) -> f32 {
    if share.is_finite() {
        share.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Turns raw spectra into [`AudioFeatureFrame`]s.
///
/// The previous frame's three energies are the only state carried between
/// calls.
#[derive(Debug, Clone)]
pub struct AudioFeatureExtractor {
    layout: BandLayout,
    sensitivity: f32,
    keep_spectrum: bool,
    last: [f32; 3],
}

impl Default for AudioFeatureExtractor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AudioFeatureExtractor {
    pub fn new(sensitivity: f32) -> Self {
        Self::with_layout(BandLayout::default(), sensitivity)
    }

    pub fn with_layout(layout: BandLayout, sensitivity: f32) -> Self {
        let mut extractor = Self {
            layout,
            sensitivity: 1.0,
            keep_spectrum: true,
            last: [0.0; 3],
        };
        extractor.set_sensitivity(sensitivity);
        extractor
    }

    /// Disables or enables the per-bin snapshot in produced frames.
    pub fn with_spectrum(mut self, keep: bool) -> Self {
        self.keep_spectrum = keep;
        self
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Non-finite values count as zero; negative values clamp to zero.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = if sensitivity.is_finite() {
            sensitivity.max(0.0)
        } else {
            0.0
        };
    }

    pub fn layout(&self) -> BandLayout {
        self.layout
    }

    /// Forgets the previous frame, so the next attack is measured from zero.
    pub fn reset(&mut self) {
        self.last = [0.0; 3];
    }

    /// Consumes a byte spectrum (one magnitude per bin, `0..=255`).
    pub fn update(&mut self, spectrum: &[u8]) -> AudioFeatureFrame {
        self.extract(spectrum.len(), |i| spectrum[i] as f32 / BYTE_BIN_MAX)
    }

    /// Consumes a float spectrum already normalised to `[0, 1]`. Non-finite
    /// bins count as silence.
    pub fn update_f32(&mut self, spectrum: &[f32]) -> AudioFeatureFrame {
        self.extract(spectrum.len(), |i| {
            let value = spectrum[i];
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
    }

    fn extract(&mut self, bins: usize, normalised: impl Fn(usize) -> f32) -> AudioFeatureFrame {
        let ranges = self.layout.ranges(bins);
        let mut energies = [0.0_f32; 3];

        for (energy, range) in energies.iter_mut().zip(ranges) {
            let divisor = range.len().max(1) as f32;
            let sum: f32 = range.map(&normalised).sum();
            let scaled = (sum / divisor) * self.sensitivity;
            *energy = if scaled.is_finite() {
                scaled.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        let mut attacks = [0.0_f32; 3];
        for ((attack, energy), last) in attacks.iter_mut().zip(energies).zip(self.last) {
            *attack = (energy - last).max(0.0);
        }
        self.last = energies;

        let spectrum = if self.keep_spectrum {
            (0..bins).map(&normalised).collect()
        } else {
            Vec::new()
        };

        AudioFeatureFrame {
            bass: energies[0],
            mid: energies[1],
            treble: energies[2],
            bass_attack: attacks[0],
            mid_attack: attacks[1],
            treble_attack: attacks[2],
            spectrum,
        }
    }
}
