//! View transform: scene units ↔ screen pixels.
//!
//! Scene units are logical coordinates multiplied by the coordinate scale.
//! The camera then applies `screen = scene · zoom + pan`.

use kurbo::{Affine, Point, Rect, Size, Vec2};

pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 5.0;
/// Upper bound for the logical → scene multiplier (exclusive lower bound 0).
pub const MAX_COORDINATE_SCALE: f64 = 5.0;
/// Zoom button step.
pub const ZOOM_STEP: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub zoom: f64,
    pub pan: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Camera {
    pub fn clamp_zoom(z: f64) -> f64 {
        z.clamp(MIN_ZOOM, MAX_ZOOM)
    }

    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    pub fn to_screen(&self, scene: Point) -> Point {
        Point::new(
            scene.x * self.zoom + self.pan.x,
            scene.y * self.zoom + self.pan.y,
        )
    }

    pub fn to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Set zoom keeping the scene point under `anchor` (screen) fixed.
    /// Returns `false` when the clamped zoom is unchanged.
    pub fn set_zoom_at(&mut self, anchor: Point, zoom: f64) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let next = Self::clamp_zoom(zoom);
        if next == self.zoom {
            return false;
        }
        let world = self.to_world(anchor);
        self.zoom = next;
        self.pan = Vec2::new(anchor.x - world.x * next, anchor.y - world.y * next);
        true
    }

    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        self.set_zoom_at(anchor, self.zoom * factor)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Centre `bounds` (scene units) in the viewport with `padding` pixels
    /// on every side. Degenerate extents count as 1 unit.
    pub fn fit_to(&mut self, bounds: Rect, viewport: Size, padding: f64) -> bool {
        let finite = [bounds.x0, bounds.y0, bounds.x1, bounds.y1]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return false;
        }
        let w = bounds.width().max(1.0);
        let h = bounds.height().max(1.0);
        let zoom = ((viewport.width - 2.0 * padding) / w).min((viewport.height - 2.0 * padding) / h);
        self.zoom = if zoom.is_finite() {
            Self::clamp_zoom(zoom)
        } else {
            1.0
        };
        let center = bounds.center();
        self.pan = Vec2::new(
            viewport.width / 2.0 - center.x * self.zoom,
            viewport.height / 2.0 - center.y * self.zoom,
        );
        true
    }

    /// Scene-space rectangle covered by a viewport.
    pub fn visible_world(&self, viewport: Size) -> Rect {
        Rect::from_points(
            self.to_world(Point::ZERO),
            self.to_world(Point::new(viewport.width, viewport.height)),
        )
    }
}

/// Whether `s` is an acceptable coordinate scale: `0 < s ≤ 5`.
pub fn valid_coordinate_scale(s: f64) -> bool {
    s.is_finite() && s > 0.0 && s <= MAX_COORDINATE_SCALE
}
