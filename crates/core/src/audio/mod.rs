use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AudioConfig, Result, SlotDeckError, SpectrumAnalyzer};

/// Thread-safe intake for captured audio.
///
/// A capture callback pushes sample blocks from its own thread while the
/// render loop reads spectrum snapshots through an [`AnalysisHandle`].
#[derive(Debug)]
pub struct AudioEngine {
    config: AudioConfig,
    analyzer: Arc<Mutex<SpectrumAnalyzer>>,
}

impl AudioEngine {
    pub fn new(config: AudioConfig) -> Self {
        let analyzer = SpectrumAnalyzer::new(&config);
        Self {
            config,
            analyzer: Arc::new(Mutex::new(analyzer)),
        }
    }

    /// Returns the sample rate the engine operates at.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Resets the shared analyser and returns a handle for the render loop.
    pub fn start(&self) -> Result<AnalysisHandle> {
        self.lock_analyzer()?.reset();
        Ok(AnalysisHandle::new(self.analyzer.clone()))
    }

    /// Feeds a block of mono samples into the analyser. Empty blocks are
    /// ignored.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut analyzer = self.lock_analyzer()?;
        analyzer.process_block(samples)?;
        Ok(())
    }

    fn lock_analyzer(&self) -> Result<MutexGuard<'_, SpectrumAnalyzer>> {
        lock(&self.analyzer)
    }
}

/// Shared, thread-safe view over the analyser managed by [`AudioEngine`].
#[derive(Clone)]
pub struct AnalysisHandle {
    shared: Arc<Mutex<SpectrumAnalyzer>>,
}

impl AnalysisHandle {
    pub(crate) fn new(shared: Arc<Mutex<SpectrumAnalyzer>>) -> Self {
        Self { shared }
    }

    /// Copies the latest byte spectrum.
    pub fn spectrum(&self) -> Result<Vec<u8>> {
        Ok(lock(&self.shared)?.spectrum().to_vec())
    }

    /// Copies the latest spectrum into `out`, reusing its allocation.
    pub fn spectrum_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let analyzer = lock(&self.shared)?;
        out.clear();
        out.extend_from_slice(analyzer.spectrum());
        Ok(())
    }

    pub fn bin_count(&self) -> Result<usize> {
        Ok(lock(&self.shared)?.bin_count())
    }
}

impl std::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle").finish()
    }
}

fn lock(shared: &Mutex<SpectrumAnalyzer>) -> Result<MutexGuard<'_, SpectrumAnalyzer>> {
    shared
        .lock()
        .map_err(|_| SlotDeckError::msg("spectrum analyser has been poisoned"))
}
