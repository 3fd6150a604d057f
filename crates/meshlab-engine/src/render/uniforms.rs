//! CPU-side mirrors of the WGSL uniform blocks.

use bytemuck::{Pod, Zeroable};

use meshlab_core::field::FieldFrame;
use meshlab_core::model::POINT_CAPACITY;

// ── field ─────────────────────────────────────────────────────────────────

/// `FieldUniforms` in `shaders/field.wgsl` (240 bytes).
///
///  offset   0  params      [f32; 4]      time, noise, warp, warp_size
///  offset  16  shape       u32
///  offset  20  count       u32           active points, at most capacity
///  offset  24  warp_gain   f32
///  offset  28  _pad        f32
///  offset  32  background  [f32; 4]      rgb, unused
///  offset  48  points      [[f32; 4]; 6] x, y, radius, intensity
///  offset 144  colors      [[f32; 4]; 6] rgb, unused
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FieldUniform {
    pub params: [f32; 4],
    pub shape: u32,
    pub count: u32,
    pub warp_gain: f32,
    pub _pad: f32,
    pub background: [f32; 4],
    pub points: [[f32; 4]; POINT_CAPACITY],
    pub colors: [[f32; 4]; POINT_CAPACITY],
}

impl FieldUniform {
    pub fn from_frame(frame: &FieldFrame) -> Self {
        let c = &frame.config;
        let bg = c.background_color.to_rgb();
        let mut u = Self {
            params: [frame.time, c.noise_strength, c.warp, c.warp_size],
            shape: u32::from(c.warp_shape.index()),
            count: 0,
            warp_gain: c.warp_shape.warp_gain(),
            _pad: 0.0,
            background: [bg.r, bg.g, bg.b, 0.0],
            points: [[0.0; 4]; POINT_CAPACITY],
            colors: [[0.0; 4]; POINT_CAPACITY],
        };

        let active = frame.active_points();
        for (i, p) in active.iter().enumerate() {
            u.points[i] = [p.position.x, p.position.y, p.radius, p.intensity];
            u.colors[i] = [p.color.r, p.color.g, p.color.b, 0.0];
        }
        u.count = active.len() as u32;
        u
    }
}

// ── handles ───────────────────────────────────────────────────────────────

/// Viewport in logical pixels, padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ViewportUniform {
    pub viewport: [f32; 2],
    pub _pad: [f32; 2],
}

pub(crate) fn min_binding_size<T>() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<T>() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlab_core::coords::Vec2;
    use meshlab_core::export::SceneTime;
    use meshlab_core::model::{default_points, GlobalConfig, WarpShape};
    use meshlab_core::render_loop::resolve_frame;

    #[test]
    fn layout_matches_shader_block() {
        assert_eq!(std::mem::size_of::<FieldUniform>(), 240);
        assert_eq!(std::mem::offset_of!(FieldUniform, background), 32);
        assert_eq!(std::mem::offset_of!(FieldUniform, points), 48);
        assert_eq!(std::mem::offset_of!(FieldUniform, colors), 144);
    }

    #[test]
    fn packs_frame_inputs() {
        let mut config = GlobalConfig::default();
        config.warp_shape = WarpShape::Rows;
        let time = SceneTime {
            shader_time: 2.5,
            elapsed: 0.0,
        };
        let frame = resolve_frame(&default_points(), &config, time, None);
        let u = FieldUniform::from_frame(&frame);

        assert_eq!(u.params, [2.5, 0.22, 0.35, 0.45]);
        assert_eq!((u.shape, u.count), (2, 3));
        assert_eq!(u.warp_gain, 2.5);
        assert_eq!(u.points[0], [0.15, 0.25, 1.1, 1.0]);
        assert_eq!(u.points[3], [0.0; 4]);
        assert!((u.colors[0][2] - 231.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn extra_points_are_dropped() {
        let mut frame = resolve_frame(&default_points(), &GlobalConfig::default(), SceneTime::default(), None);
        let p = frame.points[0];
        frame.points = vec![p; POINT_CAPACITY + 2];
        frame.points[POINT_CAPACITY - 1].position = Vec2::new(0.9, 0.9);
        let u = FieldUniform::from_frame(&frame);
        assert_eq!(u.count as usize, POINT_CAPACITY);
        assert_eq!(u.points[POINT_CAPACITY - 1][0], 0.9);
    }
}
