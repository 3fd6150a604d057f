//! Pointer hit testing and the handle drag state machine.

use crate::coords::{Vec2, Viewport};
use crate::model::{PointId, PointPatch};
use crate::render_loop::Handle;
use crate::session::Session;

/// Handle box side as a fraction of the viewport height.
pub const HANDLE_EXTENT: f32 = 0.042;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Hovering(PointId),
    Dragging(PointId),
}

/// Square hit region of a handle, in screen pixels.
#[inline]
pub fn handle_half_extent(viewport: Viewport) -> f32 {
    0.5 * HANDLE_EXTENT * viewport.height
}

/// Topmost handle under `(x, y)`. Later handles draw over earlier ones.
pub fn hit_test(handles: &[Handle], viewport: Viewport, x: f32, y: f32) -> Option<&Handle> {
    let half = handle_half_extent(viewport);
    handles.iter().rev().find(|h| {
        let (hx, hy) = viewport.from_uv(h.position);
        (x - hx).abs() <= half && (y - hy).abs() <= half
    })
}

#[derive(Debug, Default)]
pub struct Interaction {
    state: DragState,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// The point being dragged, if any. Drift is suppressed for it.
    pub fn dragging(&self) -> Option<&PointId> {
        match &self.state {
            DragState::Dragging(id) => Some(id),
            _ => None,
        }
    }

    pub fn hovered(&self) -> Option<&PointId> {
        match &self.state {
            DragState::Hovering(id) | DragState::Dragging(id) => Some(id),
            DragState::Idle => None,
        }
    }

    /// Pointer moved to screen position `(x, y)`.
    ///
    /// While dragging, the point follows the pointer's texture coordinate
    /// without clamping; otherwise hover is recomputed.
    pub fn pointer_moved(
        &mut self,
        session: &mut Session,
        handles: &[Handle],
        viewport: Viewport,
        x: f32,
        y: f32,
    ) {
        if let DragState::Dragging(id) = &self.state {
            let uv: Vec2 = viewport.to_uv(x, y);
            session.update_point(id, PointPatch::position(uv));
            return;
        }
        self.state = match hit_test(handles, viewport, x, y) {
            Some(h) => DragState::Hovering(h.id.clone()),
            None => DragState::Idle,
        };
    }

    /// Starts a drag on the handle under the pointer. Returns whether a drag
    /// started; a new drag replaces any prior one.
    pub fn pointer_pressed(&mut self, handles: &[Handle], viewport: Viewport, x: f32, y: f32) -> bool {
        match hit_test(handles, viewport, x, y) {
            Some(h) => {
                self.state = DragState::Dragging(h.id.clone());
                true
            }
            None => false,
        }
    }

    pub fn pointer_released(&mut self, handles: &[Handle], viewport: Viewport, x: f32, y: f32) {
        if !matches!(self.state, DragState::Dragging(_)) {
            return;
        }
        self.state = match hit_test(handles, viewport, x, y) {
            Some(h) => DragState::Hovering(h.id.clone()),
            None => DragState::Idle,
        };
    }

    pub fn pointer_left(&mut self) {
        self.state = DragState::Idle;
    }

    /// Drops hover/drag state that refers to a point no longer in the session.
    pub fn sync(&mut self, session: &Session) {
        let stale = self.hovered().is_some_and(|id| !session.contains(id));
        if stale {
            log::debug!("interaction target went away; back to idle");
            self.state = DragState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::{RenderLoop, SteppedClock};

    const VP: Viewport = Viewport::new(1000.0, 500.0);

    fn handles(session: &Session) -> Vec<Handle> {
        RenderLoop::new(SteppedClock::new()).tick(session, None).handles
    }

    fn screen_of(session: &Session, id: &str) -> (f32, f32) {
        let p = session.point(&PointId::from(id)).unwrap().position;
        VP.from_uv(p)
    }

    // ── hit testing ───────────────────────────────────────────────────────

    #[test]
    fn hit_region_is_a_square_scaled_by_height() {
        let s = Session::new();
        let hs = handles(&s);
        let (x, y) = screen_of(&s, "3");
        let half = handle_half_extent(VP);
        assert!((half - 10.5).abs() < 1e-4);

        assert_eq!(hit_test(&hs, VP, x + 10.0, y - 10.0).map(|h| h.id.as_str()), Some("3"));
        assert!(hit_test(&hs, VP, x + 11.0, y).is_none());
    }

    #[test]
    fn topmost_handle_wins() {
        let mut s = Session::new();
        s.update_point(&PointId::from("1"), PointPatch::position(Vec2::new(0.5, 0.5)));
        let hs = handles(&s);
        let (x, y) = screen_of(&s, "3");
        assert_eq!(hit_test(&hs, VP, x, y).unwrap().id.as_str(), "3");
    }

    // ── state machine ─────────────────────────────────────────────────────

    #[test]
    fn hover_then_drag_then_release() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "2");

        ix.pointer_moved(&mut s, &hs, VP, x, y);
        assert_eq!(ix.state(), &DragState::Hovering(PointId::from("2")));

        assert!(ix.pointer_pressed(&hs, VP, x, y));
        assert_eq!(ix.dragging(), Some(&PointId::from("2")));

        ix.pointer_moved(&mut s, &hs, VP, 250.0, 125.0);
        assert_eq!(s.point(&PointId::from("2")).unwrap().position, Vec2::new(0.25, 0.75));

        let hs = handles(&s);
        ix.pointer_released(&hs, VP, 250.0, 125.0);
        assert_eq!(ix.state(), &DragState::Hovering(PointId::from("2")));
    }

    #[test]
    fn release_off_handle_goes_idle() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "1");
        ix.pointer_pressed(&hs, VP, x, y);
        ix.pointer_released(&hs, VP, 999.0, 1.0);
        assert_eq!(ix.state(), &DragState::Idle);
    }

    #[test]
    fn press_on_empty_canvas_does_nothing() {
        let s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        assert!(!ix.pointer_pressed(&hs, VP, 999.0, 1.0));
        assert_eq!(ix.state(), &DragState::Idle);
    }

    #[test]
    fn drag_is_not_clamped_to_canvas() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "1");
        ix.pointer_pressed(&hs, VP, x, y);

        ix.pointer_moved(&mut s, &hs, VP, -500.0, 750.0);
        let p = s.point(&PointId::from("1")).unwrap().position;
        assert_eq!(p, Vec2::new(-0.5, -0.5));
    }

    #[test]
    fn leaving_canvas_resets_to_idle() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "1");
        ix.pointer_pressed(&hs, VP, x, y);
        ix.pointer_left();
        assert_eq!(ix.state(), &DragState::Idle);

        // Moving after leaving no longer drags.
        ix.pointer_moved(&mut s, &hs, VP, 10.0, 10.0);
        assert_eq!(s.point(&PointId::from("1")).unwrap().position, Vec2::new(0.15, 0.25));
    }

    #[test]
    fn removing_dragged_point_returns_to_idle() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "3");
        ix.pointer_pressed(&hs, VP, x, y);

        s.remove_point(&PointId::from("3"));
        ix.sync(&s);
        assert_eq!(ix.state(), &DragState::Idle);
    }

    #[test]
    fn dragged_point_stops_drifting() {
        let mut s = Session::new();
        let hs = handles(&s);
        let mut ix = Interaction::new();
        let (x, y) = screen_of(&s, "1");
        ix.pointer_pressed(&hs, VP, x, y);

        let mut rl = RenderLoop::new(SteppedClock::new());
        rl.clock_mut().set(3.0);
        let f = rl.tick(&s, ix.dragging());
        assert_eq!(f.field.points[0].position, s.points()[0].position);
    }
}
