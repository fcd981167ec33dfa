use std::f32::consts::TAU;

/// Deterministic test signal: a decaying kick on every beat over a quiet
/// pad, with an off-beat hat. Enough to exercise all three bands.
#[derive(Debug)]
pub struct BeatSynth {
    sample_rate: f32,
    beat_seconds: f32,
    time: f64,
}

impl BeatSynth {
    pub fn new(sample_rate: u32, bpm: f32) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 120.0 };
        Self {
            sample_rate: sample_rate.max(1) as f32,
            beat_seconds: 60.0 / bpm,
            time: 0.0,
        }
    }

    /// Produces the next `len` samples.
    pub fn next_block(&mut self, len: usize) -> Vec<f32> {
        let step = 1.0 / self.sample_rate as f64;
        (0..len)
            .map(|_| {
                let t = self.time as f32;
                self.time += step;
                self.sample(t)
            })
            .collect()
    }

    fn sample(&self, t: f32) -> f32 {
        let since_beat = t % self.beat_seconds;
        let since_offbeat = (t + self.beat_seconds / 2.0) % self.beat_seconds;

        let kick = (-since_beat * 14.0).exp() * (TAU * 55.0 * since_beat).sin();
        let pad = 0.1 * (TAU * 440.0 * t).sin();
        let hat = 0.2 * (-since_offbeat * 60.0).exp() * (TAU * 7_000.0 * t).sin();
        (0.7 * kick + pad + hat).clamp(-1.0, 1.0)
    }
}
