use std::f32::consts::TAU;

use crate::{
    render::Surface,
    scene::{Rgba, SceneConfig, SurfaceSize, VisualScene},
    AudioFeatureFrame,
};

use super::PULSING_POLYGON;

const SIDES: usize = 6;
/// Base radius as a share of the shorter surface edge.
const BASE_RADIUS: f32 = 0.15;

/// Hexagon outline: mid energy spins it, bass swells it and treble pushes
/// every other vertex outwards.
#[derive(Debug)]
pub struct PulsingPolygon {
    color: Rgba,
    unit: f32,
    rotation: f32,
    scale: f32,
    spike: f32,
    visible: bool,
    disposed: bool,
}

impl PulsingPolygon {
    pub fn new(size: SurfaceSize, config: &SceneConfig) -> Self {
        Self {
            color: config.foreground,
            unit: size.width.min(size.height) as f32,
            rotation: 0.0,
            scale: 1.0,
            spike: 0.0,
            visible: false,
            disposed: false,
        }
    }

    /// Vertex positions relative to the centre, in pixels.
    pub fn vertices(&self) -> [(f32, f32); SIDES] {
        let base = self.unit * BASE_RADIUS;
        std::array::from_fn(|i| {
            let mut radius = base;
            if i % 2 == 0 {
                radius += self.spike * base;
            }
            let angle = (i as f32 / SIDES as f32) * TAU + self.rotation;
            (
                angle.cos() * radius * self.scale,
                angle.sin() * radius * self.scale,
            )
        })
    }
}

impl VisualScene for PulsingPolygon {
    fn name(&self) -> &str {
        PULSING_POLYGON
    }

    fn update(&mut self, frame: &AudioFeatureFrame, _elapsed: f32) {
        if self.disposed {
            return;
        }
        self.rotation = (self.rotation + frame.mid.clamp(0.0, 1.0) * 0.05) % TAU;
        self.scale = 1.0 + frame.bass.clamp(0.0, 1.0) * 1.5;
        self.spike = frame.treble.clamp(0.0, 1.0) * (2.0 / 3.0);
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
        let cx = target.width() as f32 / 2.0;
        let cy = target.height() as f32 / 2.0;
        let points = self.vertices();
        for (i, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(i + 1) % SIDES];
            target.draw_line((cx + x0, cy + y0), (cx + x1, cy + y1), self.color);
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
