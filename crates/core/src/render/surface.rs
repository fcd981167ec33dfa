use crate::scene::{Rgba, SurfaceSize};

/// Tightly packed RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    size: SurfaceSize,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            pixels: vec![0; size.pixel_count() * 4],
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Reallocates to `size`; contents are cleared to transparent black.
    pub fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.pixels.clear();
        self.pixels.resize(size.pixel_count() * 4, 0);
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let i = self.index(x as i64, y as i64)?;
        let px = &self.pixels[i..i + 4];
        Some(Rgba {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }

    /// Source-over blends `color` onto one pixel. Out of bounds is ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let alpha = color.a as f32 / 255.0;
        let px = &mut self.pixels[i..i + 4];
        for (dst, src) in px.iter_mut().zip([color.r, color.g, color.b]) {
            *dst = lerp_u8(*dst, src, alpha);
        }
        px[3] = px[3].max(color.a);
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as i64).min(self.size.width as i64);
        let y1 = (y + h as i64).min(self.size.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba) {
        let (x0, y0) = from;
        let (x1, y1) = to;
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().clamp(1.0, 8192.0) as usize;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            self.blend_pixel(x.round() as i64, y.round() as i64, color);
        }
    }

    pub fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba) {
        let (cx, cy) = center;
        if !(cx.is_finite() && cy.is_finite() && radius.is_finite()) || radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        for y in y0.max(0)..=y1.min(self.size.height as i64 - 1) {
            for x in x0.max(0)..=x1.min(self.size.width as i64 - 1) {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size.width as i64 || y >= self.size.height as i64 {
            return None;
        }
        Some((y as usize * self.size.width as usize + x as usize) * 4)
    }
}

/// Per-channel linear interpolation `a * (1 - t) + b * t` with `t` clamped
/// to `[0, 1]`. All three slices must have the same length.
pub fn blend_rgba(a: &[u8], b: &[u8], t: f32, out: &mut [u8]) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    for ((dst, &ca), &cb) in out.iter_mut().zip(a).zip(b) {
        *dst = lerp_u8(ca, cb, t);
    }
}

pub(crate) fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 * (1.0 - t) + b as f32 * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_interpolates_every_channel() {
        let a = [0, 100, 200, 255];
        let b = [200, 100, 0, 55];
        let mut out = [0; 4];

        blend_rgba(&a, &b, 0.25, &mut out);
        assert_eq!(out, [50, 100, 150, 205]);

        blend_rgba(&a, &b, 7.0, &mut out);
        assert_eq!(out, b);
    }

    #[test]
    fn drawing_outside_bounds_is_ignored() {
        let mut surface = Surface::new(SurfaceSize::new(4, 4));
        surface.blend_pixel(-1, 2, Rgba::WHITE);
        surface.fill_rect(2, 2, 10, 10, Rgba::WHITE);
        surface.draw_line((-10.0, -10.0), (f32::NAN, 0.0), Rgba::WHITE);

        assert_eq!(surface.pixel(3, 3), Some(Rgba::WHITE));
        assert_eq!(surface.pixel(1, 1), Some(Rgba { r: 0, g: 0, b: 0, a: 0 }));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn resize_reallocates_and_clears() {
        let mut surface = Surface::new(SurfaceSize::new(2, 2));
        surface.clear(Rgba::WHITE);
        surface.resize(SurfaceSize::new(3, 1));

        assert_eq!(surface.pixels().len(), 12);
        assert!(surface.pixels().iter().all(|&c| c == 0));
    }

    #[test]
    fn circles_and_lines_touch_expected_pixels() {
        let mut surface = Surface::new(SurfaceSize::new(9, 9));
        surface.fill_circle((4.5, 4.5), 2.0, Rgba::WHITE);
        assert_eq!(surface.pixel(4, 4), Some(Rgba::WHITE));
        assert_eq!(surface.pixel(0, 0).map(|c| c.r), Some(0));

        surface.clear(Rgba::BLACK);
        surface.draw_line((0.0, 0.0), (8.0, 8.0), Rgba::WHITE);
        assert!((0..9).all(|i| surface.pixel(i, i) == Some(Rgba::WHITE)));
    }
}
