use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::HexColor;

/// Distortion pattern applied to sampling coordinates.
///
/// Serialized as its numeric index (0 flow, 1 liquid, 2 rows, 3 columns).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WarpShape {
    #[default]
    Flow,
    Liquid,
    Rows,
    Columns,
}

impl WarpShape {
    pub const ALL: [WarpShape; 4] = [
        WarpShape::Flow,
        WarpShape::Liquid,
        WarpShape::Rows,
        WarpShape::Columns,
    ];

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Banded shapes tolerate a larger size and a stronger warp.
    #[inline]
    pub fn is_banded(self) -> bool {
        matches!(self, WarpShape::Rows | WarpShape::Columns)
    }

    /// Upper bound for `warpSize` under this shape.
    #[inline]
    pub fn max_warp_size(self) -> f32 {
        if self.is_banded() { 3.0 } else { 1.0 }
    }

    /// Multiplier applied to `warp` before offsetting uv.
    #[inline]
    pub fn warp_gain(self) -> f32 {
        if self.is_banded() { 2.5 } else { 1.5 }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            WarpShape::Flow => "flow",
            WarpShape::Liquid => "liquid",
            WarpShape::Rows => "rows",
            WarpShape::Columns => "columns",
        }
    }
}

impl From<WarpShape> for u8 {
    fn from(s: WarpShape) -> u8 {
        s.index()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWarpShape(pub u8);

impl fmt::Display for UnknownWarpShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown warp shape {} (expected 0..=3)", self.0)
    }
}

impl std::error::Error for UnknownWarpShape {}

impl TryFrom<u8> for WarpShape {
    type Error = UnknownWarpShape;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(v as usize).copied().ok_or(UnknownWarpShape(v))
    }
}

/// Scene-wide shading and animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    pub background_color: HexColor,
    pub noise_strength: f32,
    pub animation_speed: f32,
    pub warp: f32,
    pub warp_size: f32,
    pub warp_shape: WarpShape,
    pub is_animated: bool,
    pub is_drifting: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            background_color: HexColor::new(0x17, 0x17, 0x17),
            noise_strength: 0.22,
            animation_speed: 0.4,
            warp: 0.35,
            warp_size: 0.45,
            warp_shape: WarpShape::Flow,
            is_animated: true,
            is_drifting: true,
        }
    }
}

impl GlobalConfig {
    /// Applies every field in `patch`, then re-establishes the warp size bound.
    ///
    /// A shape change re-clamps the current size; a size edit is clamped to
    /// whichever shape is current after the patch.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(c) = patch.background_color {
            self.background_color = c;
        }
        if let Some(n) = patch.noise_strength {
            self.noise_strength = n.max(0.0);
        }
        if let Some(s) = patch.animation_speed {
            self.animation_speed = s.max(0.0);
        }
        if let Some(w) = patch.warp {
            self.warp = w.max(0.0);
        }
        if let Some(shape) = patch.warp_shape {
            self.warp_shape = shape;
        }
        if let Some(size) = patch.warp_size {
            self.warp_size = size;
        }
        if let Some(a) = patch.is_animated {
            self.is_animated = a;
        }
        if let Some(d) = patch.is_drifting {
            self.is_drifting = d;
        }
        self.warp_size = self
            .warp_size
            .clamp(super::MIN_WARP_SIZE, self.warp_shape.max_warp_size());
    }
}

/// Partial update for [`GlobalConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigPatch {
    pub background_color: Option<HexColor>,
    pub noise_strength: Option<f32>,
    pub animation_speed: Option<f32>,
    pub warp: Option<f32>,
    pub warp_size: Option<f32>,
    pub warp_shape: Option<WarpShape>,
    pub is_animated: Option<bool>,
    pub is_drifting: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_shape(shape: WarpShape) -> ConfigPatch {
        ConfigPatch {
            warp_shape: Some(shape),
            ..ConfigPatch::default()
        }
    }

    #[test]
    fn shape_change_reclamps_size() {
        let mut c = GlobalConfig::default();
        c.apply(&with_shape(WarpShape::Rows));
        c.apply(&ConfigPatch {
            warp_size: Some(2.7),
            ..ConfigPatch::default()
        });
        assert_eq!(c.warp_size, 2.7);

        c.apply(&with_shape(WarpShape::Liquid));
        assert_eq!(c.warp_size, 1.0);
    }

    #[test]
    fn size_never_exceeds_shape_max() {
        for from in WarpShape::ALL {
            for to in WarpShape::ALL {
                for size in [0.0, 0.5, 1.0, 1.7, 3.0, 9.0] {
                    let mut c = GlobalConfig::default();
                    c.apply(&with_shape(from));
                    c.apply(&ConfigPatch {
                        warp_size: Some(size),
                        ..ConfigPatch::default()
                    });
                    c.apply(&with_shape(to));
                    assert!(c.warp_size <= to.max_warp_size(), "{from:?}->{to:?} size {size}");
                    assert!(c.warp_size >= crate::model::MIN_WARP_SIZE);
                }
            }
        }
    }

    #[test]
    fn shape_serializes_as_index() {
        assert_eq!(serde_json::to_string(&WarpShape::Columns).unwrap(), "3");
        assert_eq!(serde_json::from_str::<WarpShape>("1").unwrap(), WarpShape::Liquid);
        assert!(serde_json::from_str::<WarpShape>("4").is_err());
    }

    #[test]
    fn next_cycles_through_all_shapes() {
        let mut s = WarpShape::Flow;
        for expected in [WarpShape::Liquid, WarpShape::Rows, WarpShape::Columns, WarpShape::Flow] {
            s = s.next();
            assert_eq!(s, expected);
        }
    }
}
