//! Time-driven point drift.
//!
//! The live preview, the video frame loop and the motion keyframe generator
//! all call [`drifted`]; the exported JS program is generated from the
//! constants below.

use crate::coords::Vec2;
use crate::model::GlobalConfig;

pub const DRIFT_AMPLITUDE: f64 = 0.05;
pub const DRIFT_FREQ_X: f64 = 0.5;
pub const DRIFT_FREQ_Y: f64 = 0.7;

/// Whether drift applies to a point this frame.
#[inline]
pub fn is_active(config: &GlobalConfig, held: bool) -> bool {
    config.is_drifting && config.animation_speed > 0.0 && !held
}

/// Drift offset of the point at `index` after `elapsed` seconds.
///
/// The y term starts at zero and only ever pulls down, so a point sits at
/// its base position at `t = 0`.
#[inline]
pub fn offset(elapsed: f64, index: usize, speed: f64) -> [f64; 2] {
    let t = elapsed * speed;
    let k = (index + 1) as f64;
    [
        (t * k * DRIFT_FREQ_X).sin() * DRIFT_AMPLITUDE,
        ((t * k * DRIFT_FREQ_Y).cos() - 1.0) * DRIFT_AMPLITUDE,
    ]
}

/// Resolved position of a point, in f64 texture space.
///
/// `held` is true while the point is being dragged; a held point stays
/// exactly under the pointer.
pub fn drifted(base: Vec2, index: usize, elapsed: f64, config: &GlobalConfig, held: bool) -> [f64; 2] {
    let (x, y) = (base.x as f64, base.y as f64);
    if !is_active(config, held) {
        return [x, y];
    }
    let [dx, dy] = offset(elapsed, index, config.animation_speed as f64);
    [x + dx, y + dy]
}

/// [`drifted`] narrowed to the evaluator's precision.
#[inline]
pub fn drifted_uv(base: Vec2, index: usize, elapsed: f64, config: &GlobalConfig, held: bool) -> Vec2 {
    let [x, y] = drifted(base, index, elapsed, config, held);
    Vec2::new(x as f32, y as f32)
}
