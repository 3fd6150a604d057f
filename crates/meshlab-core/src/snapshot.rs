//! Flat JSON scene document: `{ "points": [...], "config": {...} }`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{is_palette_color, GlobalConfig, GradientPoint, PointId, MAX_POINTS, MIN_POINTS};

/// Immutable copy of the scene taken at the start of an export, and the
/// unit of JSON import/export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub points: Vec<GradientPoint>,
    pub config: GlobalConfig,
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    PointCount(usize),
    DuplicateId(PointId),
    InvalidPoint { id: PointId, reason: &'static str },
    /// Names the offending config key.
    InvalidConfig(&'static str),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "malformed scene document: {e}"),
            SnapshotError::PointCount(n) => write!(
                f,
                "scene has {n} points; expected {MIN_POINTS} to {MAX_POINTS}"
            ),
            SnapshotError::DuplicateId(id) => write!(f, "duplicate point id '{id}'"),
            SnapshotError::InvalidPoint { id, reason } => write!(f, "point '{id}': {reason}"),
            SnapshotError::InvalidConfig(key) => write!(f, "config '{key}' is not a finite number"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

impl SceneSnapshot {
    /// Pretty-printed JSON, two-space indent.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: SceneSnapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks the invariants a live session relies on.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let n = self.points.len();
        if !(MIN_POINTS..=MAX_POINTS).contains(&n) {
            return Err(SnapshotError::PointCount(n));
        }

        let mut seen = HashSet::new();
        for p in &self.points {
            if !seen.insert(&p.id) {
                return Err(SnapshotError::DuplicateId(p.id.clone()));
            }
            let invalid = |reason| SnapshotError::InvalidPoint {
                id: p.id.clone(),
                reason,
            };
            if !p.position.is_finite() {
                return Err(invalid("position is not finite"));
            }
            if !(p.radius.is_finite() && p.radius > 0.0) {
                return Err(invalid("radius must be positive"));
            }
            if !(0.0..=1.0).contains(&p.intensity) {
                return Err(invalid("intensity must be within [0, 1]"));
            }
            if !is_palette_color(p.color) {
                return Err(invalid("color is not in the palette"));
            }
        }

        // Out-of-range f32 literals deserialize to infinity.
        let c = &self.config;
        for (key, value) in [
            ("noiseStrength", c.noise_strength),
            ("animationSpeed", c.animation_speed),
            ("warp", c.warp),
            ("warpSize", c.warp_size),
        ] {
            if !value.is_finite() {
                return Err(SnapshotError::InvalidConfig(key));
            }
        }
        Ok(())
    }

    /// `mesh-config-<stamp>.json`
    pub fn filename(stamp: u64) -> String {
        format!("mesh-config-{stamp}.json")
    }
}
