//! Distortion strategies.
//!
//! Each shape is an independent function with the same contract:
//! `(uv, shader_time, warp_size) -> offset`. Dispatch goes through a table
//! indexed by [`WarpShape`], so shapes can be tested in isolation.

use crate::coords::Vec2;
use crate::model::WarpShape;

use super::noise::{fbm, noise};

pub type WarpFn = fn(Vec2, f32, f32) -> Vec2;

/// Shader time is slowed down before it feeds the distortion field.
pub const WARP_TIME_SCALE: f32 = 0.15;

const WARP_TABLE: [WarpFn; 4] = [flow, liquid, rows, columns];

#[inline]
pub fn strategy(shape: WarpShape) -> WarpFn {
    WARP_TABLE[shape.index() as usize]
}

#[inline]
pub fn offset(shape: WarpShape, uv: Vec2, time: f32, size: f32) -> Vec2 {
    strategy(shape)(uv, time, size)
}

/// Two-level domain warp.
pub fn flow(p: Vec2, time: f32, size: f32) -> Vec2 {
    let t = time * WARP_TIME_SCALE;
    let ps = p * size;
    let q = Vec2::new(fbm(ps + t), fbm(ps + 1.0 + t));
    let r = Vec2::new(fbm(ps + q + 0.17 * t), fbm(ps + q + 0.12 * t));
    Vec2::new(fbm(ps + r), fbm(ps + r + 1.5))
}

/// Swirl: fbm value picks both direction and magnitude.
pub fn liquid(p: Vec2, time: f32, size: f32) -> Vec2 {
    let t = time * WARP_TIME_SCALE;
    let f = fbm(p * size + t);
    let angle = f * 12.56;
    Vec2::new(angle.cos(), angle.sin()) * f
}

#[inline]
fn band_count(size: f32) -> f32 {
    (size * 4.0).floor().max(1.0)
}

/// Horizontal bands, each shifted sideways.
pub fn rows(p: Vec2, time: f32, size: f32) -> Vec2 {
    let t = time * WARP_TIME_SCALE;
    let iy = (p.y * band_count(size)).floor();
    let shift = fbm(Vec2::new(iy * 1.5, t)) * 2.0 - 1.0;
    let jitter = noise(Vec2::new(p.x * 10.0, iy)) * 0.05;
    Vec2::new(shift + jitter, 0.0)
}

/// Vertical bands, each shifted up or down.
pub fn columns(p: Vec2, time: f32, size: f32) -> Vec2 {
    let t = time * WARP_TIME_SCALE;
    let ix = (p.x * band_count(size)).floor();
    let shift = fbm(Vec2::new(ix * 1.5, t)) * 2.0 - 1.0;
    let jitter = noise(Vec2::new(ix, p.y * 10.0)) * 0.05;
    Vec2::new(0.0, shift + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_shape_index() {
        let uv = Vec2::new(0.3, 0.7);
        for (shape, f) in [
            (WarpShape::Flow, flow as WarpFn),
            (WarpShape::Liquid, liquid),
            (WarpShape::Rows, rows),
            (WarpShape::Columns, columns),
        ] {
            assert_eq!(offset(shape, uv, 1.25, 0.8), f(uv, 1.25, 0.8), "{shape:?}");
        }
    }

    #[test]
    fn rows_only_move_horizontally() {
        for i in 0..20 {
            let o = rows(Vec2::new(i as f32 * 0.05, 0.4), 2.0, 1.5);
            assert_eq!(o.y, 0.0);
            assert!(o.x.abs() <= 1.05);
        }
    }

    #[test]
    fn columns_only_move_vertically() {
        for i in 0..20 {
            let o = columns(Vec2::new(0.4, i as f32 * 0.05), 2.0, 1.5);
            assert_eq!(o.x, 0.0);
            assert!(o.y.abs() <= 1.05);
        }
    }

    #[test]
    fn rows_share_shift_within_a_band() {
        // size 0.5 gives two bands; both samples sit in the lower one at x = 0.
        let a = rows(Vec2::new(0.0, 0.1), 0.0, 0.5);
        let b = rows(Vec2::new(0.0, 0.4), 0.0, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn small_sizes_still_get_one_band() {
        assert_eq!(band_count(0.01), 1.0);
        assert_eq!(band_count(3.0), 12.0);
    }

    #[test]
    fn liquid_magnitude_equals_fbm_value() {
        let p = Vec2::new(0.2, 0.9);
        let o = liquid(p, 0.0, 0.45);
        assert!((o.length() - fbm(p * 0.45)).abs() < 1e-5);
    }

    #[test]
    fn flow_is_deterministic() {
        let p = Vec2::new(0.15, 0.25);
        assert_eq!(flow(p, 3.5, 0.45), flow(p, 3.5, 0.45));
    }
}
