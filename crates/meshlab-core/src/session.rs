//! The editing session: the one mutable owner of the scene document.
//!
//! Every edit goes through a method here. Invariant violations (a sixth
//! point, removing the last one, an off-palette color) are dropped silently
//! with a `debug` log line, never surfaced as errors.

use std::collections::HashSet;

use rand::Rng;

use crate::coords::Vec2;
use crate::export::{ExportError, ExportRequest, SceneTime};
use crate::model::{
    default_points, is_palette_color, ConfigPatch, ExportConfig, ExportPatch, GlobalConfig,
    GradientPoint, PointId, PointPatch, MAX_POINTS, MIN_POINTS, PALETTE,
};
use crate::snapshot::{SceneSnapshot, SnapshotError};

const NEW_POINT_RADIUS: f32 = 0.8;
const NEW_POINT_INTENSITY: f32 = 0.8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One-shot user-facing message. Drained by the host with
/// [`Session::take_notices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Hands out `pt-N` ids, skipping anything ever seen in this session.
#[derive(Debug, Default)]
struct IdGenerator {
    next: u64,
    issued: HashSet<PointId>,
}

impl IdGenerator {
    fn register(&mut self, id: &PointId) {
        self.issued.insert(id.clone());
    }

    fn fresh(&mut self) -> PointId {
        loop {
            self.next += 1;
            let id = PointId(format!("pt-{}", self.next));
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

#[derive(Debug)]
pub struct Session {
    points: Vec<GradientPoint>,
    config: GlobalConfig,
    export: ExportConfig,
    ids: IdGenerator,
    busy: bool,
    notices: Vec<Notice>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session on the default three-point scene.
    pub fn new() -> Self {
        let mut ids = IdGenerator::default();
        let points = default_points();
        for p in &points {
            ids.register(&p.id);
        }
        Self {
            points,
            config: GlobalConfig::default(),
            export: ExportConfig::default(),
            ids,
            busy: false,
            notices: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: SceneSnapshot) -> Result<Self, SnapshotError> {
        let mut session = Self::new();
        session.load_snapshot(snapshot)?;
        Ok(session)
    }

    // ── reads ─────────────────────────────────────────────────────────────

    pub fn points(&self) -> &[GradientPoint] {
        &self.points
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn export_config(&self) -> &ExportConfig {
        &self.export
    }

    pub fn point(&self, id: &PointId) -> Option<&GradientPoint> {
        self.points.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.point(id).is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            points: self.points.clone(),
            config: self.config,
        }
    }

    // ── point edits ───────────────────────────────────────────────────────

    /// Returns false when the id is unknown or the patch was rejected.
    pub fn update_point(&mut self, id: &PointId, patch: PointPatch) -> bool {
        if let Some(c) = patch.color.filter(|c| !is_palette_color(*c)) {
            log::debug!("rejecting off-palette color {c} for point {id}");
            return false;
        }
        match self.points.iter_mut().find(|p| &p.id == id) {
            Some(p) => {
                p.apply(&patch);
                true
            }
            None => {
                log::debug!("update for unknown point {id}");
                false
            }
        }
    }

    pub fn add_point(&mut self) -> Option<PointId> {
        self.add_point_with(&mut rand::rng())
    }

    /// Appends a point at the canvas center with a random palette color.
    /// No-op at capacity.
    pub fn add_point_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PointId> {
        if self.points.len() >= MAX_POINTS {
            log::debug!("add_point ignored: already at {MAX_POINTS} points");
            return None;
        }
        let id = self.ids.fresh();
        let color = PALETTE[rng.random_range(0..PALETTE.len())];
        self.points.push(GradientPoint {
            id: id.clone(),
            position: Vec2::new(0.5, 0.5),
            color,
            radius: NEW_POINT_RADIUS,
            intensity: NEW_POINT_INTENSITY,
        });
        Some(id)
    }

    /// No-op when `id` is the last remaining point or unknown.
    pub fn remove_point(&mut self, id: &PointId) -> bool {
        if self.points.len() <= MIN_POINTS {
            log::debug!("remove_point ignored: last point");
            return false;
        }
        let before = self.points.len();
        self.points.retain(|p| &p.id != id);
        self.points.len() != before
    }

    pub fn randomize_palette(&mut self) {
        self.randomize_palette_with(&mut rand::rng());
    }

    /// Replaces the whole point set with 2 to 5 fresh random points.
    pub fn randomize_palette_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let count = rng.random_range(2..=MAX_POINTS);
        let points: Vec<GradientPoint> = (0..count)
            .map(|_| GradientPoint {
                id: self.ids.fresh(),
                position: Vec2::new(rng.random::<f32>(), rng.random::<f32>()),
                color: PALETTE[rng.random_range(0..PALETTE.len())],
                radius: 0.4 + rng.random::<f32>() * 0.8,
                intensity: 0.6 + rng.random::<f32>() * 0.4,
            })
            .collect();
        self.points = points;
    }

    // ── config edits ──────────────────────────────────────────────────────

    pub fn update_config(&mut self, patch: ConfigPatch) {
        self.config.apply(&patch);
    }

    pub fn reset_config(&mut self) {
        self.config = GlobalConfig::default();
    }

    /// Play/pause: shader animation and drift are switched together.
    pub fn toggle_animation(&mut self) {
        let on = !self.config.is_animated;
        self.update_config(ConfigPatch {
            is_animated: Some(on),
            is_drifting: Some(on),
            ..ConfigPatch::default()
        });
    }

    pub fn update_export_config(&mut self, patch: ExportPatch) {
        self.export.apply(&patch);
    }

    /// Replaces the document. Export settings and the id history survive.
    pub fn load_snapshot(&mut self, snapshot: SceneSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        for p in &snapshot.points {
            self.ids.register(&p.id);
        }
        self.points = snapshot.points;
        self.config = snapshot.config;
        // Re-establish the warp size bound for hand-edited documents.
        self.config.apply(&ConfigPatch::default());
        Ok(())
    }

    // ── exports ───────────────────────────────────────────────────────────

    /// Marks the session busy and freezes the document for an export.
    pub fn begin_export(&mut self, time: SceneTime, stamp: u64) -> Result<ExportRequest, ExportError> {
        if self.busy {
            self.notices.push(Notice::error("An export is already running"));
            return Err(ExportError::Busy);
        }
        self.busy = true;
        Ok(ExportRequest {
            scene: self.snapshot(),
            settings: self.export,
            time,
            stamp,
        })
    }

    /// Clears the busy flag and reports the outcome once.
    ///
    /// `Ok(None)` is a silent no-op (nothing to export, surface detached).
    pub fn finish_export(&mut self, outcome: Result<Option<String>, ExportError>) {
        self.busy = false;
        match outcome {
            Ok(Some(message)) => self.notices.push(Notice::info(message)),
            Ok(None) => {}
            Err(e) => {
                log::warn!("export failed: {e}");
                self.notices.push(Notice::error(format!("Export failed: {e}")));
            }
        }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
