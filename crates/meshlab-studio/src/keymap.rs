//! Keyboard bindings for the editor window.
//!
//! | key              | action                                  |
//! |------------------|-----------------------------------------|
//! | `a`              | add a point                             |
//! | `Delete` / `⌫`   | remove the hovered (else newest) point  |
//! | `r` / `R`        | randomize palette / reset shading       |
//! | `Space`          | pause or resume                         |
//! | `d`              | toggle drift                            |
//! | `w`              | next warp shape                         |
//! | `↑` `↓`          | warp strength                           |
//! | `←` `→`          | warp size                               |
//! | `n` / `N`        | noise up / down                         |
//! | `,` `.`          | animation speed                         |
//! | `c`              | recolor the target point                |
//! | `[` `]`          | target radius                           |
//! | `-` `=`          | target intensity                        |
//! | `f` `m` `t`      | export format, scale, duration          |
//! | `p` `v` `k` `l` `j` `x` | png, video, code, motion, json, css export |
//! | `o`              | reload the scene file                   |
//! | `Esc`            | quit                                    |

use meshlab_core::model::{ConfigPatch, ExportPatch, PointPatch, MAX_MULTIPLIER, MIN_MULTIPLIER, PALETTE};
use meshlab_core::{PointId, Session};
use meshlab_engine::input::{Key, Modifiers};

use crate::config::ExportKind;

const WARP_STEP: f32 = 0.05;
const WARP_SIZE_STEP: f32 = 0.05;
const NOISE_STEP: f32 = 0.02;
const SPEED_STEP: f32 = 0.1;
const RADIUS_STEP: f32 = 0.1;
const INTENSITY_STEP: f32 = 0.1;

/// Scalar the nudge keys move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Param {
    Warp,
    WarpSize,
    Noise,
    Speed,
    Radius,
    Intensity,
}

impl Param {
    fn step(self) -> f32 {
        match self {
            Param::Warp => WARP_STEP,
            Param::WarpSize => WARP_SIZE_STEP,
            Param::Noise => NOISE_STEP,
            Param::Speed => SPEED_STEP,
            Param::Radius => RADIUS_STEP,
            Param::Intensity => INTENSITY_STEP,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Action {
    AddPoint,
    RemovePoint,
    RandomizePalette,
    ResetConfig,
    ToggleAnimation,
    ToggleDrift,
    CycleWarpShape,
    /// `+1` or `-1` steps of the parameter.
    Nudge(Param, f32),
    CycleColor,
    CycleFormat,
    CycleMultiplier,
    CycleDuration,
    Export(ExportKind),
    ReloadScene,
    Exit,
}

/// Maps a key press to its action. Chords with Ctrl/Cmd are left to the
/// platform.
pub fn action_for(key: Key, mods: Modifiers) -> Option<Action> {
    if mods.command() {
        return None;
    }

    let action = match key {
        Key::Escape => Action::Exit,
        Key::Space => Action::ToggleAnimation,
        Key::Delete | Key::Backspace => Action::RemovePoint,
        Key::ArrowUp => Action::Nudge(Param::Warp, 1.0),
        Key::ArrowDown => Action::Nudge(Param::Warp, -1.0),
        Key::ArrowRight => Action::Nudge(Param::WarpSize, 1.0),
        Key::ArrowLeft => Action::Nudge(Param::WarpSize, -1.0),
        Key::Char(c) => match (c.to_ascii_lowercase(), mods.shift || c.is_ascii_uppercase()) {
            ('a', _) => Action::AddPoint,
            ('r', false) => Action::RandomizePalette,
            ('r', true) => Action::ResetConfig,
            ('d', _) => Action::ToggleDrift,
            ('w', _) => Action::CycleWarpShape,
            ('n', false) => Action::Nudge(Param::Noise, 1.0),
            ('n', true) => Action::Nudge(Param::Noise, -1.0),
            (',', _) => Action::Nudge(Param::Speed, -1.0),
            ('.', _) => Action::Nudge(Param::Speed, 1.0),
            ('c', _) => Action::CycleColor,
            ('[', _) => Action::Nudge(Param::Radius, -1.0),
            (']', _) => Action::Nudge(Param::Radius, 1.0),
            ('-', _) => Action::Nudge(Param::Intensity, -1.0),
            ('=', _) | ('+', _) => Action::Nudge(Param::Intensity, 1.0),
            ('f', _) => Action::CycleFormat,
            ('m', _) => Action::CycleMultiplier,
            ('t', _) => Action::CycleDuration,
            ('p', _) => Action::Export(ExportKind::Png),
            ('v', _) => Action::Export(ExportKind::Video),
            ('k', _) => Action::Export(ExportKind::Code),
            ('l', _) => Action::Export(ExportKind::Motion),
            ('j', _) => Action::Export(ExportKind::Json),
            ('x', _) => Action::Export(ExportKind::Css),
            ('o', _) => Action::ReloadScene,
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

/// Applies a scene or settings edit.
///
/// Point edits land on `target`, falling back to the newest point. Returns
/// `false` for actions the caller owns (exports, reload, exit) and for
/// edits that changed nothing.
pub fn apply_edit(session: &mut Session, action: Action, target: Option<&PointId>) -> bool {
    let target = target
        .filter(|id| session.contains(id))
        .cloned()
        .or_else(|| session.points().last().map(|p| p.id.clone()));

    match action {
        Action::AddPoint => session.add_point().is_some(),
        Action::RemovePoint => target.is_some_and(|id| session.remove_point(&id)),
        Action::RandomizePalette => {
            session.randomize_palette();
            true
        }
        Action::ResetConfig => {
            session.reset_config();
            true
        }
        Action::ToggleAnimation => {
            session.toggle_animation();
            true
        }
        Action::ToggleDrift => {
            let drifting = !session.config().is_drifting;
            session.update_config(ConfigPatch {
                is_drifting: Some(drifting),
                ..ConfigPatch::default()
            });
            true
        }
        Action::CycleWarpShape => {
            let shape = session.config().warp_shape.next();
            session.update_config(ConfigPatch {
                warp_shape: Some(shape),
                ..ConfigPatch::default()
            });
            true
        }
        Action::Nudge(param, dir) => nudge(session, target.as_ref(), param, dir * param.step()),
        Action::CycleColor => {
            let Some(id) = target else { return false };
            let Some(current) = session.point(&id).map(|p| p.color) else {
                return false;
            };
            let next = PALETTE
                .iter()
                .position(|c| *c == current)
                .map_or(PALETTE[0], |i| PALETTE[(i + 1) % PALETTE.len()]);
            session.update_point(
                &id,
                PointPatch {
                    color: Some(next),
                    ..PointPatch::default()
                },
            )
        }
        Action::CycleFormat => {
            let format = session.export_config().format.next();
            session.update_export_config(ExportPatch {
                format: Some(format),
                ..ExportPatch::default()
            });
            true
        }
        Action::CycleMultiplier => {
            let m = session.export_config().multiplier;
            let next = if m >= MAX_MULTIPLIER { MIN_MULTIPLIER } else { m + 1 };
            session.update_export_config(ExportPatch {
                multiplier: Some(next),
                ..ExportPatch::default()
            });
            true
        }
        Action::CycleDuration => {
            let duration = session.export_config().duration.next();
            session.update_export_config(ExportPatch {
                duration: Some(duration),
                ..ExportPatch::default()
            });
            true
        }
        Action::Export(_) | Action::ReloadScene | Action::Exit => false,
    }
}

fn nudge(session: &mut Session, target: Option<&PointId>, param: Param, delta: f32) -> bool {
    let cfg = *session.config();
    let mut patch = ConfigPatch::default();
    match param {
        Param::Warp => patch.warp = Some(cfg.warp + delta),
        Param::WarpSize => patch.warp_size = Some(cfg.warp_size + delta),
        Param::Noise => patch.noise_strength = Some(cfg.noise_strength + delta),
        Param::Speed => patch.animation_speed = Some(cfg.animation_speed + delta),
        Param::Radius | Param::Intensity => {
            let Some(id) = target else { return false };
            let Some(point) = session.point(id) else { return false };
            let patch = match param {
                Param::Radius => PointPatch {
                    radius: Some(point.radius + delta),
                    ..PointPatch::default()
                },
                _ => PointPatch {
                    intensity: Some(point.intensity + delta),
                    ..PointPatch::default()
                },
            };
            return session.update_point(id, patch);
        }
    }
    session.update_config(patch);
    true
}

/// One-line summary of the export settings, for the window title.
pub fn export_summary(session: &Session) -> String {
    let e = session.export_config();
    let (w, h) = e.target_size();
    format!("{} {w}x{h} ({}x) {}s", e.format.name(), e.multiplier, e.duration.seconds())
}
