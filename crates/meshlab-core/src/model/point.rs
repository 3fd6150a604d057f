use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{HexColor, Vec2};

/// Stable point identifier.
///
/// Assigned at creation and never reused within a session. Imported scenes
/// keep whatever ids they carry (`"1"`, `"pt-7"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A colored influence point in texture space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientPoint {
    pub id: PointId,
    /// Base position; drift is applied on top at render time.
    pub position: Vec2,
    pub color: HexColor,
    pub radius: f32,
    pub intensity: f32,
}

impl GradientPoint {
    pub fn new(id: impl Into<String>, position: Vec2, color: HexColor, radius: f32, intensity: f32) -> Self {
        Self {
            id: PointId::new(id),
            position,
            color,
            radius,
            intensity,
        }
    }

    /// Applies every field present in `patch`.
    ///
    /// Radius is kept positive and intensity in [0, 1]. Position is stored as
    /// given, including values outside the unit square.
    pub fn apply(&mut self, patch: &PointPatch) {
        if let Some(p) = patch.position {
            self.position = p;
        }
        if let Some(c) = patch.color {
            self.color = c;
        }
        if let Some(r) = patch.radius {
            self.radius = r.max(super::MIN_RADIUS);
        }
        if let Some(i) = patch.intensity {
            self.intensity = i.clamp(0.0, 1.0);
        }
    }
}

/// Partial update for a [`GradientPoint`]. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointPatch {
    pub position: Option<Vec2>,
    pub color: Option<HexColor>,
    pub radius: Option<f32>,
    pub intensity: Option<f32>,
}

impl PointPatch {
    pub fn position(p: Vec2) -> Self {
        Self {
            position: Some(p),
            ..Self::default()
        }
    }
}
