//! Built-in CPU scenes used by the `slotdeck` driver and for smoke testing
//! the orchestration layer with real drawing.

mod bars;
mod particles;
mod polygon;

pub use bars::SpectrumBars;
pub use particles::{Particle, ParticleArena, ParticleBurst, ParticleHandle};
pub use polygon::PulsingPolygon;

use crate::{
    catalog::SceneCatalog,
    scene::{SceneConfig, SurfaceSize, VisualScene},
    Result,
};

pub const PULSING_POLYGON: &str = "pulsing_polygon";
pub const SPECTRUM_BARS: &str = "spectrum_bars";
pub const PARTICLE_BURST: &str = "particle_burst";

/// Registers every built-in scene. Returns how many names were newly added;
/// names already present in the catalog are left alone.
pub fn register_builtin_scenes(catalog: &mut SceneCatalog) -> usize {
    let registered = [
        catalog.register_factory(PULSING_POLYGON, |size: SurfaceSize, config: &SceneConfig| {
            boxed(PulsingPolygon::new(size, config))
        }),
        catalog.register_factory(SPECTRUM_BARS, |size: SurfaceSize, config: &SceneConfig| {
            boxed(SpectrumBars::new(size, config))
        }),
        catalog.register_factory(PARTICLE_BURST, |size: SurfaceSize, config: &SceneConfig| {
            boxed(ParticleBurst::new(size, config))
        }),
    ];
    registered.iter().filter(|added| **added).count()
}

fn boxed<S: VisualScene + 'static>(scene: S) -> Result<Box<dyn VisualScene>> {
    Ok(Box::new(scene))
}
