//! Uniform scale-and-letterbox mapping between screen space and the virtual canvas.
//!
//! The same transform positions the raster on screen and turns touches back into
//! canvas units, so a button drawn at some canvas rectangle is hit exactly there.

/// Side of the square virtual canvas, in canvas units
pub const VIRTUAL_SIZE: f32 = 512.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ViewTransform {
    /// Canvas units are screen units
    pub fn identity() -> Self {
        ViewTransform {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Largest uniform scale that fits the canvas on screen, centred on the free axis
    pub fn fit(screen_width: f32, screen_height: f32) -> Self {
        let scale = (screen_width / VIRTUAL_SIZE)
            .min(screen_height / VIRTUAL_SIZE)
            .max(0.0);
        ViewTransform {
            scale,
            offset_x: (screen_width - VIRTUAL_SIZE * scale) / 2.0,
            offset_y: (screen_height - VIRTUAL_SIZE * scale) / 2.0,
        }
    }

    /// Screen point to canvas point; `None` in the letterbox bars or off canvas
    pub fn to_virtual(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        if !(self.scale > 0.0) {
            return None;
        }
        let vx = (x - self.offset_x) / self.scale;
        let vy = (y - self.offset_y) / self.scale;
        let inside = |v: f32| (0.0..VIRTUAL_SIZE).contains(&v);
        if inside(vx) && inside(vy) {
            Some((vx, vy))
        } else {
            None
        }
    }

    pub fn to_screen(&self, vx: f32, vy: f32) -> (f32, f32) {
        (
            vx * self.scale + self.offset_x,
            vy * self.scale + self.offset_y,
        )
    }
}
