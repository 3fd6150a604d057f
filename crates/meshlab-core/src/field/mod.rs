//! CPU reference of the procedural field.
//!
//! `evaluate` is the per-pixel function; `rasterize` runs it over a whole
//! frame. The GPU fragment shader in `meshlab-engine` and the exported GLSL
//! implement the same math and must be kept in step with this module.

pub mod noise;
pub mod warp;

use rayon::prelude::*;

use crate::coords::{Rgb, Vec2};
use crate::model::{GlobalConfig, GradientPoint, POINT_CAPACITY};

use noise::{hash, mix, smoothstep};

/// Warp amounts at or below this are treated as "no warp".
pub const WARP_EPSILON: f32 = 0.001;

/// Rate at which the animated grain layer is re-seeded.
const GRAIN_RATE: f32 = 1.37;

/// One point as the evaluator sees it: position already resolved (drift or
/// drag applied), color already normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldPoint {
    pub position: Vec2,
    pub color: Rgb,
    pub radius: f32,
    pub intensity: f32,
}

impl FieldPoint {
    pub fn resolved(point: &GradientPoint, position: Vec2) -> Self {
        Self {
            position,
            color: point.color.to_rgb(),
            radius: point.radius,
            intensity: point.intensity,
        }
    }
}

/// Every evaluator input for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFrame {
    /// Shader time in seconds.
    pub time: f32,
    pub config: GlobalConfig,
    /// At most [`POINT_CAPACITY`] entries; extra points are ignored.
    pub points: Vec<FieldPoint>,
}

impl FieldFrame {
    #[inline]
    pub fn active_points(&self) -> &[FieldPoint] {
        &self.points[..self.points.len().min(POINT_CAPACITY)]
    }

    #[inline]
    pub fn sample(&self, uv: Vec2) -> Rgb {
        evaluate(uv, self.time, &self.config, self.active_points())
    }
}

#[inline]
fn screen(base: f32, layer: f32) -> f32 {
    1.0 - (1.0 - base) * (1.0 - layer)
}

/// Shades one texture-space coordinate.
///
/// Starts from the background, screen-blends each point's cubic falloff on
/// top, then adds zero-mean film grain and clamps to [0, 1].
pub fn evaluate(uv: Vec2, time: f32, config: &GlobalConfig, points: &[FieldPoint]) -> Rgb {
    let mut out = config.background_color.to_rgb();

    let warped = config.warp > WARP_EPSILON;
    let distortion = if warped {
        warp::offset(config.warp_shape, uv, time, config.warp_size)
    } else {
        Vec2::zero()
    };
    let power = config.warp * config.warp_shape.warp_gain();

    for p in points.iter().take(POINT_CAPACITY) {
        let mut sample = uv;
        if warped {
            sample = sample + distortion * (power * p.radius);
        }

        let dist = sample.distance(p.position);
        let falloff = 1.0 - smoothstep(0.0, p.radius, dist);
        let influence = falloff * falloff * falloff * p.intensity;

        out = Rgb::new(
            screen(out.r, p.color.r * influence),
            screen(out.g, p.color.g * influence),
            screen(out.b, p.color.b * influence),
        );
    }

    let n = config.noise_strength;
    let static_grain = hash(uv);
    let animated_grain = hash(uv + (time * GRAIN_RATE).fract());
    let grain = mix(static_grain, animated_grain, 0.5) * n - 0.5 * n;

    Rgb::new(out.r + grain, out.g + grain, out.b + grain).clamped()
}

/// Rasterizes a frame into tightly packed RGBA8, rows top to bottom.
///
/// Row 0 is the top edge (uv.y near 1). Each pixel samples its center.
/// Rows are shaded in parallel.
pub fn rasterize(frame: &FieldFrame, width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut pixels = vec![0u8; w * h * 4];
    if w == 0 || h == 0 {
        return pixels;
    }

    let inv_w = 1.0 / width as f32;
    let inv_h = 1.0 / height as f32;

    pixels
        .par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let v = 1.0 - (y as f32 + 0.5) * inv_h;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let u = (x as f32 + 0.5) * inv_w;
                let [r, g, b] = frame.sample(Vec2::new(u, v)).to_u8();
                px.copy_from_slice(&[r, g, b, 255]);
            }
        });

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{default_points, ConfigPatch, WarpShape};

    fn frame(config: GlobalConfig) -> FieldFrame {
        let points = default_points()
            .iter()
            .map(|p| FieldPoint::resolved(p, p.position))
            .collect();
        FieldFrame {
            time: 0.0,
            config,
            points,
        }
    }

    fn screen_rgb(base: Rgb, layer: Rgb) -> Rgb {
        Rgb::new(
            screen(base.r, layer.r),
            screen(base.g, layer.g),
            screen(base.b, layer.b),
        )
    }

    // ── default scene ─────────────────────────────────────────────────────

    #[test]
    fn nearest_point_dominates_at_its_own_position() {
        let f = frame(GlobalConfig::default());
        let c = f.sample(Vec2::new(0.15, 0.25));
        assert!(c.b > c.r && c.b > c.g, "{c:?}");
        assert!(c.b > 0.4, "{c:?}");
    }

    #[test]
    fn unwarped_sample_is_point_color_over_background_plus_grain() {
        let mut config = GlobalConfig::default();
        config.warp = 0.0;
        let f = frame(config);
        let c = f.sample(Vec2::new(0.15, 0.25));

        let p1 = f.points[0].color;
        let expected = screen_rgb(config.background_color.to_rgb(), p1);
        // Grain is bounded by half the noise strength; the two far points add
        // less than 0.01 on top.
        let tol = 0.5 * config.noise_strength + 0.01;
        for (got, want) in c.to_array().iter().zip(expected.to_array()) {
            assert!((got - want).abs() <= tol, "{got} vs {want}");
        }
    }

    #[test]
    fn without_noise_or_points_output_is_background() {
        let mut config = GlobalConfig::default();
        config.noise_strength = 0.0;
        let c = evaluate(Vec2::new(0.4, 0.6), 2.0, &config, &[]);
        assert_eq!(c, config.background_color.to_rgb());
    }

    // ── bounds ────────────────────────────────────────────────────────────

    #[test]
    fn output_is_clamped_for_every_shape() {
        for shape in WarpShape::ALL {
            let mut config = GlobalConfig::default();
            config.apply(&ConfigPatch {
                warp_shape: Some(shape),
                warp: Some(1.0),
                noise_strength: Some(0.25),
                ..ConfigPatch::default()
            });
            let f = frame(config);
            for i in 0..50 {
                let uv = Vec2::new(i as f32 / 49.0, 1.0 - i as f32 / 49.0);
                let c = f.sample(uv);
                for ch in c.to_array() {
                    assert!((0.0..=1.0).contains(&ch), "{shape:?} {uv:?} {c:?}");
                }
            }
        }
    }

    #[test]
    fn points_beyond_capacity_are_ignored() {
        let mut config = GlobalConfig::default();
        config.noise_strength = 0.0;
        config.warp = 0.0;
        let far = FieldPoint {
            position: Vec2::new(5.0, 5.0),
            color: Rgb::splat(1.0),
            radius: 0.1,
            intensity: 1.0,
        };
        let near = FieldPoint {
            position: Vec2::new(0.5, 0.5),
            ..far
        };
        let mut pts = vec![far; POINT_CAPACITY];
        pts.push(near);
        let c = evaluate(Vec2::new(0.5, 0.5), 0.0, &config, &pts);
        let bg = config.background_color.to_rgb();
        assert!((c.r - bg.r).abs() < 1e-5 && (c.g - bg.g).abs() < 1e-5, "{c:?}");
    }

    // ── rasterize ─────────────────────────────────────────────────────────

    #[test]
    fn rasterize_rows_run_top_to_bottom() {
        let mut config = GlobalConfig::default();
        config.noise_strength = 0.0;
        config.warp = 0.0;
        let f = FieldFrame {
            time: 0.0,
            config,
            points: vec![FieldPoint {
                position: Vec2::new(0.5, 0.9),
                color: Rgb::new(1.0, 1.0, 1.0),
                radius: 0.3,
                intensity: 1.0,
            }],
        };
        let (w, h) = (8u32, 8u32);
        let px = rasterize(&f, w, h);
        assert_eq!(px.len(), (w * h * 4) as usize);

        let top = px[(4 * 4) as usize];
        let bottom = px[((h - 1) * w * 4 + 4 * 4) as usize];
        assert!(top > bottom, "top {top} bottom {bottom}");
        assert!(px.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn rasterize_empty_target() {
        let f = frame(GlobalConfig::default());
        assert!(rasterize(&f, 0, 10).is_empty());
    }
}
