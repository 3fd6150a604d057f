//! Plain data describing a scene: influence points, global shading config
//! and the session-local export settings.

mod config;
mod export;
mod point;

pub use config::{ConfigPatch, GlobalConfig, UnknownWarpShape, WarpShape};
pub use export::{
    ExportConfig, ExportDuration, ExportFormat, ExportPatch, MAX_MULTIPLIER, MIN_MULTIPLIER,
};
pub use point::{GradientPoint, PointId, PointPatch};

use crate::coords::{HexColor, Vec2};

pub const MIN_POINTS: usize = 1;
pub const MAX_POINTS: usize = 5;

/// Uniform array length in every shader rendition. One slot stays unused.
pub const POINT_CAPACITY: usize = 6;

pub const MIN_WARP_SIZE: f32 = 0.01;
pub const MIN_RADIUS: f32 = 0.01;

/// The only colors a point may carry.
pub const PALETTE: [HexColor; 2] = [
    HexColor::new(0x02, 0x20, 0xE7),
    HexColor::new(0xFF, 0xA4, 0x9B),
];

pub fn is_palette_color(c: HexColor) -> bool {
    PALETTE.contains(&c)
}

/// The scene a fresh session starts with.
pub fn default_points() -> Vec<GradientPoint> {
    let [blue, pink] = PALETTE;
    vec![
        GradientPoint::new("1", Vec2::new(0.15, 0.25), blue, 1.1, 1.0),
        GradientPoint::new("2", Vec2::new(0.85, 0.75), pink, 1.1, 1.0),
        GradientPoint::new("3", Vec2::new(0.5, 0.5), blue, 0.6, 0.7),
    ]
}
