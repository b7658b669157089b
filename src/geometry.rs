use crate::foundation::core::{Affine, Canvas, Vec2};

const ZOOM_MIN: f64 = 0.01;
const ZOOM_MAX: f64 = 100.0;

/// Position, size, zoom, rotation and spin state of a layer.
///
/// Mutated only by the owning layer's own code path (its automations, or
/// the context acting on its behalf); never by another layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    /// Horizontal position of the upper-left corner on the canvas.
    pub x: f64,
    /// Vertical position of the upper-left corner on the canvas.
    pub y: f64,
    /// Layer frame width in pixels.
    pub w: u32,
    /// Layer frame height in pixels.
    pub h: u32,
    /// Horizontal magnification, 1.0 = original size.
    pub zoom_x: f64,
    /// Vertical magnification, 1.0 = original size.
    pub zoom_y: f64,
    /// Rotation angle in degrees, kept in `[0, 360)`.
    pub rotation: f64,
    /// Continuous rotation increment, degrees per second.
    pub spin_rotation: f64,
    /// Continuous zoom increment per second (added to both axes).
    pub spin_zoom: f64,
}

impl Geometry {
    /// Identity geometry for a `w`×`h` frame at the origin.
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w,
            h,
            zoom_x: 1.0,
            zoom_y: 1.0,
            rotation: 0.0,
            spin_rotation: 0.0,
            spin_zoom: 0.0,
        }
    }

    /// Move to an absolute position; coordinates refer to the upper-left
    /// corner.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Set the magnification for both axes. Values snap to identity when
    /// both are within rounding distance of 1.0.
    pub fn set_zoom(&mut self, x: f64, y: f64) {
        self.zoom_x = x.clamp(ZOOM_MIN, ZOOM_MAX);
        self.zoom_y = y.clamp(ZOOM_MIN, ZOOM_MAX);
        if (self.zoom_x - 1.0).abs() < 1e-9 && (self.zoom_y - 1.0).abs() < 1e-9 {
            self.zoom_x = 1.0;
            self.zoom_y = 1.0;
        }
    }

    /// Set the rotation angle in degrees; wraps into `[0, 360)`.
    pub fn set_rotate(&mut self, angle: f64) {
        self.rotation = angle.rem_euclid(360.0);
    }

    /// Continuously rotate and zoom with the given per-second increments.
    pub fn set_spin(&mut self, rotation: f64, zoom: f64) {
        self.spin_rotation = rotation;
        self.spin_zoom = zoom;
    }

    /// Whether any spin increment is active.
    pub fn has_spin(&self) -> bool {
        self.spin_rotation != 0.0 || self.spin_zoom != 0.0
    }

    /// Advance the spin state by one frame interval.
    pub fn apply_spin(&mut self, dt_secs: f64) {
        if self.spin_rotation != 0.0 {
            self.set_rotate(self.rotation + self.spin_rotation * dt_secs);
        }
        if self.spin_zoom != 0.0 {
            let dz = self.spin_zoom * dt_secs;
            self.set_zoom(self.zoom_x + dz, self.zoom_y + dz);
        }
    }

    /// Whether the blitter must scale this layer.
    pub fn zooming(&self) -> bool {
        self.zoom_x != 1.0 || self.zoom_y != 1.0
    }

    /// Whether the blitter must rotate this layer.
    pub fn rotating(&self) -> bool {
        self.rotation != 0.0
    }

    /// Scale and center the layer on the canvas, optionally preserving the
    /// source aspect ratio.
    pub fn fit(&mut self, canvas: Canvas, keep_aspect: bool) {
        if self.w == 0 || self.h == 0 {
            return;
        }
        let sx = f64::from(canvas.width) / f64::from(self.w);
        let sy = f64::from(canvas.height) / f64::from(self.h);
        if keep_aspect {
            let s = sx.min(sy);
            self.set_zoom(s, s);
        } else {
            self.set_zoom(sx, sy);
        }
        let out_w = f64::from(self.w) * self.zoom_x;
        let out_h = f64::from(self.h) * self.zoom_y;
        self.x = (f64::from(canvas.width) - out_w) / 2.0;
        self.y = (f64::from(canvas.height) - out_h) / 2.0;
    }

    /// Transform mapping layer-local pixel coordinates to canvas
    /// coordinates. Rotation and zoom pivot on the frame center.
    pub fn to_affine(&self) -> Affine {
        let center = Vec2::new(f64::from(self.w) / 2.0, f64::from(self.h) / 2.0);
        let t_position = Affine::translate(Vec2::new(self.x, self.y));
        let t_anchor = Affine::translate(center);
        let t_unanchor = Affine::translate(-center);
        let t_rotate = Affine::rotate(self.rotation.to_radians());
        let t_scale = Affine::scale_non_uniform(self.zoom_x, self.zoom_y);
        t_position * t_anchor * t_rotate * t_scale * t_unanchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Point;

    #[test]
    fn identity_affine_when_unzoomed_unrotated() {
        let mut g = Geometry::new(10, 10);
        g.set_position(3.0, 4.0);
        let p = g.to_affine() * Point::new(0.0, 0.0);
        assert!((p.x - 3.0).abs() < 1e-9);
        assert!((p.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_wraps_into_range() {
        let mut g = Geometry::new(4, 4);
        g.set_rotate(370.0);
        assert!((g.rotation - 10.0).abs() < 1e-9);
        g.set_rotate(-10.0);
        assert!((g.rotation - 350.0).abs() < 1e-9);
    }

    #[test]
    fn spin_advances_rotation_and_zoom() {
        let mut g = Geometry::new(4, 4);
        g.set_spin(90.0, 0.5);
        g.apply_spin(1.0);
        assert!((g.rotation - 90.0).abs() < 1e-9);
        assert!((g.zoom_x - 1.5).abs() < 1e-9);
    }

    #[test]
    fn zoom_snaps_back_to_identity() {
        let mut g = Geometry::new(4, 4);
        g.set_zoom(2.0, 2.0);
        assert!(g.zooming());
        g.set_zoom(1.0 + 1e-12, 1.0);
        assert!(!g.zooming());
    }

    #[test]
    fn fit_centers_and_preserves_aspect() {
        let mut g = Geometry::new(100, 50);
        g.fit(Canvas::new(200, 200).unwrap(), true);
        assert!((g.zoom_x - 2.0).abs() < 1e-9);
        assert!((g.zoom_y - 2.0).abs() < 1e-9);
        assert!((g.x - 0.0).abs() < 1e-9);
        assert!((g.y - 50.0).abs() < 1e-9);
    }
}
