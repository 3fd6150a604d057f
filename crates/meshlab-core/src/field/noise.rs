//! Value noise primitives. Every function here has a line-for-line twin in
//! `field.wgsl` and in the exported GLSL.

use crate::coords::Vec2;

const HASH_SCALE: Vec2 = Vec2::new(123.34, 456.21);
const HASH_BIAS: f32 = 45.32;

const FBM_OCTAVES: usize = 4;
const FBM_LACUNARITY: f32 = 2.02;

#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// GLSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pseudo-random value in [0, 1) for a 2D lattice coordinate.
#[inline]
pub fn hash(p: Vec2) -> f32 {
    let mut q = p.mul_elem(HASH_SCALE).fract();
    q = q + q.dot(q + HASH_BIAS);
    (q.x * q.y).fract()
}

/// Bilinear value noise with a smoothstep fade.
pub fn noise(p: Vec2) -> f32 {
    let i = p.floor();
    let mut f = p.fract();
    f = Vec2::new(f.x * f.x * (3.0 - 2.0 * f.x), f.y * f.y * (3.0 - 2.0 * f.y));

    let a = hash(i);
    let b = hash(i + Vec2::new(1.0, 0.0));
    let c = hash(i + Vec2::new(0.0, 1.0));
    let d = hash(i + Vec2::new(1.0, 1.0));
    mix(mix(a, b, f.x), mix(c, d, f.x), f.y)
}

/// Rotation applied between octaves: GLSL `mat2(0.8, 0.6, -0.6, 0.8) * p`.
#[inline]
fn rotate(p: Vec2) -> Vec2 {
    Vec2::new(0.8 * p.x - 0.6 * p.y, 0.6 * p.x + 0.8 * p.y)
}

/// Four-octave fractal noise. Output lies in [0, 0.9375).
pub fn fbm(mut p: Vec2) -> f32 {
    let mut v = 0.0;
    let mut a = 0.5;
    for _ in 0..FBM_OCTAVES {
        v += a * noise(p);
        p = rotate(p) * FBM_LACUNARITY;
        a *= 0.5;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_origin_is_zero() {
        assert_eq!(hash(Vec2::zero()), 0.0);
    }

    #[test]
    fn hash_stays_in_unit_range() {
        for i in 0..200 {
            let p = Vec2::new(i as f32 * 0.731 - 40.0, i as f32 * 1.913 + 3.0);
            let h = hash(p);
            assert!((0.0..1.0).contains(&h), "hash({p:?}) = {h}");
        }
    }

    #[test]
    fn noise_matches_hash_on_lattice_points() {
        let p = Vec2::new(3.0, -2.0);
        assert!((noise(p) - hash(p)).abs() < 1e-6);
    }

    #[test]
    fn fbm_is_bounded() {
        for i in 0..200 {
            let p = Vec2::new(i as f32 * 0.173, i as f32 * -0.291);
            let v = fbm(p);
            assert!((0.0..0.9375).contains(&v), "fbm({p:?}) = {v}");
        }
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }
}
