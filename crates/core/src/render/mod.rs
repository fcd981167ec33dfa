//! Final image assembly: single-pass rendering or a two-pass crossfade
//! between isolated offscreen surfaces.

mod strobe;
mod surface;

pub use strobe::StrobePass;
pub use surface::{blend_rgba, Surface};

use crate::{
    scene::{Rgba, SceneKey, SurfaceSize},
    AudioFeatureFrame, VisualConfig,
};

/// What the compositor needs from the owner of the scene instances.
pub trait SceneGraph {
    /// `(from, to, progress)` while a crossfade is running.
    fn active_transition(&self) -> Option<(SceneKey, SceneKey, f32)>;

    /// Shows or hides one instance. Unknown keys are ignored.
    fn set_visible(&mut self, key: SceneKey, visible: bool);

    /// Draws every visible scene into `target`.
    fn render_visible(&mut self, target: &mut Surface);
}

/// Owns the presentation surface and the two offscreen crossfade surfaces.
///
/// Scenes never see the offscreen surfaces directly; they draw into whatever
/// target [`SceneGraph::render_visible`] is handed.
#[derive(Debug)]
pub struct Compositor {
    background: Rgba,
    present: Surface,
    offscreen_a: Surface,
    offscreen_b: Surface,
    strobe: StrobePass,
}

impl Compositor {
    pub fn new(size: SurfaceSize, background: Rgba) -> Self {
        Self {
            background,
            present: Surface::new(size),
            offscreen_a: Surface::new(size),
            offscreen_b: Surface::new(size),
            strobe: StrobePass::default(),
        }
    }

    pub fn from_config(size: SurfaceSize, visual: &VisualConfig) -> Self {
        let mut compositor = Self::new(size, visual.background);
        compositor.strobe = StrobePass::from_config(visual);
        compositor
    }

    pub fn size(&self) -> SurfaceSize {
        self.present.size()
    }

    /// Resizes the presentation target and both offscreen surfaces together.
    pub fn resize(&mut self, size: SurfaceSize) {
        self.present.resize(size);
        self.offscreen_a.resize(size);
        self.offscreen_b.resize(size);
        tracing::debug!(width = size.width, height = size.height, "compositor resized");
    }

    pub fn set_background(&mut self, color: Rgba) {
        self.background = color;
    }

    pub fn configure(&mut self, visual: &VisualConfig) {
        self.background = visual.background;
        self.strobe.configure(visual);
    }

    pub fn strobe(&self) -> &StrobePass {
        &self.strobe
    }

    /// Advances time-based post effects for this frame.
    pub fn update_effects(&mut self, frame: &AudioFeatureFrame, delta: f32) {
        self.strobe.update(frame, delta);
    }

    /// The most recently presented frame.
    pub fn presented(&self) -> &Surface {
        &self.present
    }

    /// Produces this tick's image.
    ///
    /// Without a transition the visible scenes are drawn straight into the
    /// presentation target. During a transition `from` and `to` are drawn in
    /// isolation into surfaces A and B, then mixed by the transition
    /// progress. Both scenes are left visible afterwards.
    pub fn render<G: SceneGraph + ?Sized>(&mut self, graph: &mut G) -> &Surface {
        match graph.active_transition() {
            None => {
                self.present.clear(self.background);
                graph.render_visible(&mut self.present);
            }
            Some((from, to, progress)) => {
                graph.set_visible(from, true);
                graph.set_visible(to, false);
                self.offscreen_a.clear(self.background);
                graph.render_visible(&mut self.offscreen_a);

                graph.set_visible(from, false);
                graph.set_visible(to, true);
                self.offscreen_b.clear(self.background);
                graph.render_visible(&mut self.offscreen_b);

                graph.set_visible(from, true);

                blend_rgba(
                    self.offscreen_a.pixels(),
                    self.offscreen_b.pixels(),
                    progress,
                    self.present.pixels_mut(),
                );
            }
        }

        self.strobe.apply(&mut self.present);
        &self.present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: SceneKey = SceneKey::new(0, 1);
    const BLUE: SceneKey = SceneKey::new(1, 1);

    /// Two solid-color layers; records every render target size it sees.
    struct SolidGraph {
        layers: Vec<(SceneKey, Rgba, bool)>,
        transition: Option<(SceneKey, SceneKey, f32)>,
        passes: Vec<SurfaceSize>,
    }

    impl SolidGraph {
        fn new() -> Self {
            Self {
                layers: vec![
                    (RED, Rgba::rgb(255, 0, 0), true),
                    (BLUE, Rgba::rgb(0, 0, 255), false),
                ],
                transition: None,
                passes: Vec::new(),
            }
        }

        fn visible(&self, key: SceneKey) -> bool {
            self.layers.iter().any(|(k, _, v)| *k == key && *v)
        }
    }

    impl SceneGraph for SolidGraph {
        fn active_transition(&self) -> Option<(SceneKey, SceneKey, f32)> {
            self.transition
        }

        fn set_visible(&mut self, key: SceneKey, visible: bool) {
            for layer in self.layers.iter_mut().filter(|(k, _, _)| *k == key) {
                layer.2 = visible;
            }
        }

        fn render_visible(&mut self, target: &mut Surface) {
            self.passes.push(target.size());
            for (_, color, visible) in &self.layers {
                if *visible {
                    target.clear(*color);
                }
            }
        }
    }

    fn quiet_compositor(size: SurfaceSize) -> Compositor {
        Compositor::from_config(
            size,
            &VisualConfig {
                strobe_enabled: false,
                ..VisualConfig::default()
            },
        )
    }

    #[test]
    fn single_pass_without_transition() {
        let mut graph = SolidGraph::new();
        let mut compositor = quiet_compositor(SurfaceSize::new(2, 2));

        let frame = compositor.render(&mut graph);
        assert_eq!(frame.pixel(1, 1), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(graph.passes.len(), 1);
    }

    #[test]
    fn transition_blends_isolated_passes() {
        let mut graph = SolidGraph::new();
        graph.transition = Some((RED, BLUE, 0.25));
        let mut compositor = quiet_compositor(SurfaceSize::new(2, 2));

        let frame = compositor.render(&mut graph).clone();
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(191, 0, 64)));
        assert_eq!(graph.passes.len(), 2);
        assert!(graph.visible(RED));
        assert!(graph.visible(BLUE));
    }

    #[test]
    fn progress_extremes_show_one_scene() {
        let mut graph = SolidGraph::new();
        let mut compositor = quiet_compositor(SurfaceSize::new(1, 1));

        graph.transition = Some((RED, BLUE, 0.0));
        assert_eq!(compositor.render(&mut graph).pixel(0, 0), Some(Rgba::rgb(255, 0, 0)));

        graph.transition = Some((RED, BLUE, 1.0));
        assert_eq!(compositor.render(&mut graph).pixel(0, 0), Some(Rgba::rgb(0, 0, 255)));
    }

    #[test]
    fn resize_keeps_every_surface_in_step() {
        let mut graph = SolidGraph::new();
        graph.transition = Some((RED, BLUE, 0.5));
        let mut compositor = quiet_compositor(SurfaceSize::new(2, 2));

        let size = SurfaceSize::new(5, 3);
        compositor.resize(size);
        let frame = compositor.render(&mut graph);

        assert_eq!(frame.size(), size);
        assert_eq!(frame.pixels().len(), 5 * 3 * 4);
        assert!(graph.passes.iter().all(|pass| *pass == size));
    }

    #[test]
    fn strobe_is_applied_after_compositing() {
        let mut graph = SolidGraph::new();
        graph.layers[0].2 = false;
        let mut compositor = Compositor::new(SurfaceSize::new(1, 1), Rgba::BLACK);
        compositor.update_effects(
            &AudioFeatureFrame {
                bass_attack: 1.0,
                ..AudioFeatureFrame::silent()
            },
            0.016,
        );

        let frame = compositor.render(&mut graph);
        assert_eq!(frame.pixel(0, 0), Some(Rgba::rgb(128, 128, 128)));
    }
}
