//! Per-frame driver for the live preview.
//!
//! The loop owns an injectable [`Clock`] and turns the session plus the
//! current drag into a [`LiveFrame`]: the evaluator inputs and the handle
//! positions to draw on top.

use crate::coords::Vec2;
use crate::drift::drifted_uv;
use crate::export::SceneTime;
use crate::field::{FieldFrame, FieldPoint};
use crate::model::{GlobalConfig, GradientPoint, PointId, POINT_CAPACITY};
use crate::session::Session;

/// Source of elapsed seconds since the loop started.
pub trait Clock {
    fn elapsed(&self) -> f64;
}

/// Clock advanced explicitly by the host, one frame delta at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SteppedClock {
    elapsed: f64,
}

impl SteppedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    pub fn set(&mut self, elapsed: f64) {
        self.elapsed = elapsed.max(0.0);
    }
}

impl Clock for SteppedClock {
    fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

/// Where a point's handle is drawn this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Handle {
    pub id: PointId,
    /// Zero-based draw order; labels show `P{index + 1}`.
    pub index: usize,
    /// Texture-space position, drift included.
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveFrame {
    pub field: FieldFrame,
    pub handles: Vec<Handle>,
    pub time: SceneTime,
}

/// Builds evaluator inputs for arbitrary times.
///
/// `held` names the point under the pointer; it keeps its base position.
pub fn resolve_frame(
    points: &[GradientPoint],
    config: &GlobalConfig,
    time: SceneTime,
    held: Option<&PointId>,
) -> FieldFrame {
    let points = points
        .iter()
        .take(POINT_CAPACITY)
        .enumerate()
        .map(|(i, p)| {
            let is_held = held == Some(&p.id);
            let pos = drifted_uv(p.position, i, time.elapsed, config, is_held);
            FieldPoint::resolved(p, pos)
        })
        .collect();

    FieldFrame {
        time: time.shader_time,
        config: *config,
        points,
    }
}

pub struct RenderLoop<C: Clock> {
    clock: C,
    shader_time: f32,
}

impl<C: Clock> RenderLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            shader_time: 0.0,
        }
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Current scene time without advancing anything.
    pub fn time(&self) -> SceneTime {
        SceneTime {
            shader_time: self.shader_time,
            elapsed: self.clock.elapsed(),
        }
    }

    /// Resolves one frame.
    ///
    /// Shader time follows the clock while the scene is animated and holds its
    /// last value otherwise. Drift always reads the clock directly.
    pub fn tick(&mut self, session: &Session, held: Option<&PointId>) -> LiveFrame {
        let config = session.config();
        let elapsed = self.clock.elapsed();
        if config.is_animated {
            self.shader_time = elapsed as f32;
        }
        let time = SceneTime {
            shader_time: self.shader_time,
            elapsed,
        };

        let field = resolve_frame(session.points(), config, time, held);
        let handles = session
            .points()
            .iter()
            .zip(&field.points)
            .enumerate()
            .map(|(index, (p, fp))| Handle {
                id: p.id.clone(),
                index,
                position: fp.position,
            })
            .collect();

        LiveFrame {
            field,
            handles,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift;
    use crate::model::ConfigPatch;

    fn live() -> RenderLoop<SteppedClock> {
        RenderLoop::new(SteppedClock::new())
    }

    #[test]
    fn shader_time_follows_clock_while_animated() {
        let s = Session::new();
        let mut rl = live();
        rl.clock_mut().advance(1.5);
        assert_eq!(rl.tick(&s, None).field.time, 1.5);
    }

    #[test]
    fn shader_time_holds_while_paused() {
        let mut s = Session::new();
        let mut rl = live();
        rl.clock_mut().advance(2.0);
        rl.tick(&s, None);

        s.update_config(ConfigPatch {
            is_animated: Some(false),
            ..ConfigPatch::default()
        });
        rl.clock_mut().advance(3.0);
        let f = rl.tick(&s, None);
        assert_eq!(f.field.time, 2.0);
        assert_eq!(f.time.elapsed, 5.0);
    }

    #[test]
    fn live_positions_match_drift_function() {
        let s = Session::new();
        let mut rl = live();
        rl.clock_mut().set(7.25);
        let f = rl.tick(&s, None);
        for (i, (p, fp)) in s.points().iter().zip(&f.field.points).enumerate() {
            let [x, y] = drift::drifted(p.position, i, 7.25, s.config(), false);
            assert!((fp.position.x as f64 - x).abs() < 1e-6);
            assert!((fp.position.y as f64 - y).abs() < 1e-6);
        }
    }

    #[test]
    fn held_point_does_not_drift() {
        let s = Session::new();
        let mut rl = live();
        rl.clock_mut().set(4.0);
        let held = PointId::from("2");
        let f = rl.tick(&s, Some(&held));
        assert_eq!(f.field.points[1].position, s.points()[1].position);
        assert_ne!(f.field.points[0].position, s.points()[0].position);
        assert_eq!(f.handles[1].position, s.points()[1].position);
    }

    #[test]
    fn handles_follow_document_order() {
        let s = Session::new();
        let f = live().tick(&s, None);
        let ids: Vec<_> = f.handles.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(f.handles[2].index, 2);
    }

    #[test]
    fn stepped_clock_ignores_bad_deltas() {
        let mut c = SteppedClock::new();
        c.advance(-1.0);
        c.advance(f64::NAN);
        c.advance(0.25);
        assert_eq!(c.elapsed(), 0.25);
    }
}
