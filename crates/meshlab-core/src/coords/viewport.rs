use super::Vec2;

/// Canvas size in logical pixels.
///
/// Screen space has its origin at the top-left with +Y down; texture space
/// (uv) has its origin at the bottom-left with +Y up. This type owns the
/// mapping between the two.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Maps a screen position to texture space.
    ///
    /// The result is not clamped: a pointer outside the canvas yields
    /// coordinates outside [0, 1].
    #[inline]
    pub fn to_uv(self, x: f32, y: f32) -> Vec2 {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        Vec2::new(x / w, 1.0 - y / h)
    }

    /// Inverse of [`to_uv`](Self::to_uv).
    #[inline]
    pub fn from_uv(self, uv: Vec2) -> (f32, f32) {
        (uv.x * self.width, (1.0 - uv.y) * self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_maps_to_uv_top_left() {
        let vp = Viewport::new(200.0, 100.0);
        assert_eq!(vp.to_uv(0.0, 0.0), Vec2::new(0.0, 1.0));
        assert_eq!(vp.to_uv(200.0, 100.0), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn outside_canvas_is_not_clamped() {
        let vp = Viewport::new(100.0, 100.0);
        let uv = vp.to_uv(-50.0, 150.0);
        assert_eq!(uv, Vec2::new(-0.5, -0.5));
    }

    #[test]
    fn from_uv_inverts_to_uv() {
        let vp = Viewport::new(640.0, 480.0);
        let (x, y) = vp.from_uv(vp.to_uv(123.0, 456.0));
        assert!((x - 123.0).abs() < 1e-3);
        assert!((y - 456.0).abs() < 1e-3);
    }
}
