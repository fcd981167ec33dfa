use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AudioConfig, Result, SlotDeckError};

/// Magnitudes below this floor are treated as silence before the dB mapping.
const MIN_MAGNITUDE: f32 = 1e-12;

/// Converts blocks of PCM samples into a byte magnitude spectrum.
///
/// The analyser keeps the most recent `fft_size` samples, applies a Hann
/// window, runs a real FFT and smooths every bin over time. Smoothed
/// magnitudes are mapped from `[min_decibels, max_decibels]` onto `0..=255`,
/// giving `fft_size / 2` bins per call.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    history: Vec<f32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    fft: Option<FftResources>,
}

impl SpectrumAnalyzer {
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let bins = fft_size / 2;
        Self {
            fft_size,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            history: vec![0.0; fft_size],
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            fft: None,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// The spectrum produced by the most recent [`Self::process_block`].
    pub fn spectrum(&self) -> &[u8] {
        &self.bytes
    }

    /// Clears sample history and smoothing state.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }

    /// Feeds a block of mono samples and returns the refreshed spectrum.
    pub fn process_block(&mut self, samples: &[f32]) -> Result<&[u8]> {
        if samples.is_empty() {
            return Err(SlotDeckError::InvalidInput(
                "spectrum analysis requires at least one sample",
            ));
        }

        self.push_history(samples);

        let len = self.fft_size;
        let scale = 1.0 / len as f32;
        let range = (self.max_decibels - self.min_decibels).max(f32::EPSILON);

        let fft = Self::prepare_fft(&mut self.fft, len);
        for (index, (slot, value)) in fft.input.iter_mut().zip(&self.history).enumerate() {
            *slot = if value.is_finite() {
                *value * hann_value(index, len)
            } else {
                0.0
            };
        }
        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        for ((smoothed, byte), bin) in self
            .smoothed
            .iter_mut()
            .zip(self.bytes.iter_mut())
            .zip(fft.spectrum.iter())
        {
            let magnitude = bin.norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            let decibels = 20.0 * smoothed.max(MIN_MAGNITUDE).log10();
            let level = ((decibels - self.min_decibels) / range).clamp(0.0, 1.0);
            *byte = (level * 255.0).round() as u8;
        }

        Ok(&self.bytes)
    }

    fn push_history(&mut self, samples: &[f32]) {
        let len = self.fft_size;
        if samples.len() >= len {
            self.history
                .copy_from_slice(&samples[samples.len() - len..]);
        } else {
            self.history.rotate_left(samples.len());
            let start = len - samples.len();
            self.history[start..].copy_from_slice(samples);
        }
    }

    fn prepare_fft(slot: &mut Option<FftResources>, size: usize) -> &mut FftResources {
        if slot.as_ref().map(|fft| fft.size != size).unwrap_or(true) {
            *slot = None;
        }
        slot.get_or_insert_with(|| FftResources::new(size))
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn new(size: usize) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(fft_size: usize, smoothing: f32) -> SpectrumAnalyzer {
        SpectrumAnalyzer::new(&AudioConfig {
            fft_size,
            smoothing,
            ..AudioConfig::default()
        })
    }

    fn sine(freq: f32, sample_rate: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let mut analyzer = analyzer(256, 0.0);
        let spectrum = analyzer.process_block(&[0.0; 256]).unwrap();

        assert_eq!(spectrum.len(), 128);
        assert!(spectrum.iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_empty_blocks() {
        let mut analyzer = analyzer(64, 0.0);
        assert!(analyzer.process_block(&[]).is_err());
    }

    #[test]
    fn low_tone_lands_in_low_bins() {
        let mut analyzer = analyzer(256, 0.0);
        // 48 kHz / 256 = 187.5 Hz per bin; 750 Hz is bin 4.
        let spectrum = analyzer
            .process_block(&sine(750.0, 48_000.0, 256, 0.001))
            .unwrap()
            .to_vec();

        let loudest = *spectrum.iter().max().unwrap();
        let peak = spectrum.iter().position(|&value| value == loudest).unwrap();
        assert_eq!(peak, 4);
        assert!(spectrum[100] < spectrum[4]);
    }

    #[test]
    fn smoothing_decays_gradually() {
        let mut analyzer = analyzer(128, 0.8);
        analyzer
            .process_block(&sine(1_500.0, 48_000.0, 128, 1.0))
            .unwrap();
        let loud = analyzer.spectrum()[4];

        let after = analyzer.process_block(&[0.0; 128]).unwrap()[4];
        assert!(after > 0);
        assert!(after <= loud);
    }

    #[test]
    fn short_blocks_slide_the_history() {
        let mut analyzer = analyzer(64, 0.0);
        for _ in 0..8 {
            analyzer.process_block(&[0.5; 8]).unwrap();
        }
        assert!(analyzer.history.iter().all(|&s| s == 0.5));
    }
}
