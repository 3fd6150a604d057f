use meshlab_core::export::{RenderSurface, SurfaceSize, VideoJob};
use meshlab_core::interaction::Interaction;
use meshlab_core::render_loop::{Handle, RenderLoop, SteppedClock};
use meshlab_core::{Notice, NoticeLevel, Session, Viewport};
use meshlab_engine::OffscreenSurface;
use meshlab_engine::app::{App, AppControl, FrameCtx};
use meshlab_engine::device::Gpu;
use meshlab_engine::input::{InputEvent, InputFrame, MouseButton, MouseButtonState};
use meshlab_engine::render::{FieldRenderer, HandleHighlight, HandleRenderer};
use meshlab_engine::window::CursorIcon;

use crate::config::{read_scene, ExportKind, StudioConfig};
use crate::exports::Exporter;
use crate::keymap::{action_for, apply_edit, export_summary, Action};

pub const TITLE: &str = "Mesh Lab";

/// How long a notice stays in the title bar.
const STATUS_SECONDS: f64 = 4.0;

struct Status {
    message: String,
    until: f64,
}

/// The editor: one session, its live preview and the export in flight.
pub struct Studio {
    config: StudioConfig,
    session: Session,
    live: RenderLoop<SteppedClock>,
    interaction: Interaction,

    field: FieldRenderer,
    handles: HandleRenderer,

    /// Created on the first export; shares the window's device.
    surface: Option<OffscreenSurface>,
    job: Option<VideoJob>,
    exporter: Exporter,

    status: Option<Status>,
    title: String,
    cursor: CursorIcon,
}

impl Studio {
    pub fn new(config: StudioConfig, session: Session, exporter: Exporter) -> Self {
        Self {
            config,
            session,
            live: RenderLoop::new(SteppedClock::new()),
            interaction: Interaction::new(),
            field: FieldRenderer::new(),
            handles: HandleRenderer::new(),
            surface: None,
            job: None,
            exporter,
            status: None,
            title: String::new(),
            cursor: CursorIcon::Default,
        }
    }

    fn pointer(&mut self, input: &InputFrame, viewport: Viewport, handles: &[Handle]) {
        for ev in &input.events {
            match ev {
                InputEvent::PointerMoved(m) => {
                    self.interaction
                        .pointer_moved(&mut self.session, handles, viewport, m.x, m.y);
                }
                InputEvent::PointerButton(b) if b.button == MouseButton::Left => match b.state {
                    MouseButtonState::Pressed => {
                        if self.interaction.pointer_pressed(handles, viewport, b.x, b.y) {
                            log::trace!("drag started on {:?}", self.interaction.dragging());
                        }
                    }
                    MouseButtonState::Released => {
                        self.interaction.pointer_released(handles, viewport, b.x, b.y);
                    }
                },
                InputEvent::PointerLeft => self.interaction.pointer_left(),
                _ => {}
            }
        }
    }

    fn perform(&mut self, action: Action, gpu: &Gpu<'_>, live: SurfaceSize) -> AppControl {
        match action {
            Action::Exit => return AppControl::Exit,
            Action::Export(kind) => self.export(kind, gpu, live),
            Action::ReloadScene => self.reload(),
            edit => {
                let target = self.interaction.hovered().cloned();
                if apply_edit(&mut self.session, edit, target.as_ref()) {
                    log::debug!("{edit:?}");
                }
            }
        }
        AppControl::Continue
    }

    fn export(&mut self, kind: ExportKind, gpu: &Gpu<'_>, live: SurfaceSize) {
        let time = self.live.time();
        let surface = self.surface.get_or_insert_with(|| {
            log::info!("exports render on {}", gpu.adapter_info().name);
            OffscreenSurface::new(gpu.device().clone(), gpu.queue().clone(), live)
        });
        if let Some(job) = self.exporter.start(kind, &mut self.session, surface, time) {
            self.job = Some(job);
        }
    }

    fn reload(&mut self) {
        let Some(path) = self.config.scene.clone() else {
            self.session
                .notify(Notice::info("No scene file was given on the command line"));
            return;
        };
        let loaded = read_scene(&path).and_then(|scene| Ok(self.session.load_snapshot(scene)?));
        match loaded {
            Ok(()) => {
                self.interaction.sync(&self.session);
                self.session
                    .notify(Notice::info(format!("Loaded {}", path.display())));
            }
            Err(e) => self.session.notify(Notice::error(format!("{e:#}"))),
        }
    }

    fn step_video(&mut self) {
        let (Some(job), Some(surface)) = (self.job.as_mut(), self.surface.as_mut()) else {
            return;
        };
        if self.exporter.step(job, &mut self.session, surface) {
            self.job = None;
        }
    }

    /// Gives the surface back if the window closes mid-capture.
    fn abandon_video(&mut self) {
        let (Some(job), Some(surface)) = (self.job.take(), self.surface.as_mut()) else {
            return;
        };
        log::warn!("closing with {} unfinished; discarding it", job.filename());
        job.abort(surface);
    }

    fn drain_notices(&mut self, now: f64) {
        for notice in self.session.take_notices() {
            match notice.level {
                NoticeLevel::Info => log::info!("{}", notice.message),
                NoticeLevel::Error => log::warn!("{}", notice.message),
            }
            self.status = Some(Status {
                message: notice.message,
                until: now + STATUS_SECONDS,
            });
        }
    }

    fn current_title(&self, now: f64) -> String {
        let detail = match (&self.job, &self.status) {
            (Some(job), _) => format!("recording {} {}%", job.filename(), job.progress()),
            (None, Some(s)) if now < s.until => s.message.clone(),
            _ => export_summary(&self.session),
        };
        format!("{TITLE} · {detail}")
    }

    fn current_cursor(&self) -> CursorIcon {
        if self.job.is_some() {
            CursorIcon::Progress
        } else if self.interaction.dragging().is_some() {
            CursorIcon::Grabbing
        } else if self.interaction.hovered().is_some() {
            CursorIcon::Grab
        } else {
            CursorIcon::Default
        }
    }
}

impl App for Studio {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.live.clock_mut().set(ctx.time.elapsed);
        let now = ctx.time.elapsed;
        let viewport = ctx.window.viewport();
        let live = SurfaceSize::new(
            viewport.width.round() as u32,
            viewport.height.round() as u32,
            ctx.window.scale_factor(),
        );

        // Handles are hidden while a capture holds the surface, so there is
        // nothing to grab.
        if self.job.is_none() {
            let frame = self.live.tick(&self.session, self.interaction.dragging());
            self.pointer(ctx.input_frame, viewport, &frame.handles);

            if let Some(surface) = self.surface.as_mut() {
                if surface.size() != live {
                    surface.set_size(live);
                }
            }
        }

        for &key in &ctx.input_frame.keys_pressed {
            let Some(action) = action_for(key, ctx.input.modifiers) else { continue };
            if self.perform(action, ctx.gpu, live) == AppControl::Exit {
                self.abandon_video();
                return AppControl::Exit;
            }
        }
        self.interaction.sync(&self.session);

        self.step_video();
        self.drain_notices(now);

        let title = self.current_title(now);
        if title != self.title {
            ctx.runtime.set_title(title.clone());
            self.title = title;
        }
        let cursor = self.current_cursor();
        if cursor != self.cursor {
            ctx.window.set_cursor(cursor);
            self.cursor = cursor;
        }

        let clear = self.session.config().background_color.to_rgb();
        if self.job.is_some() {
            return ctx.render(clear, |_, _| {});
        }

        let frame = self.live.tick(&self.session, self.interaction.dragging());
        let highlight = HandleHighlight {
            hovered: self.interaction.hovered(),
            dragging: self.interaction.dragging(),
        };
        let (field, handles) = (&mut self.field, &mut self.handles);
        ctx.render(clear, |rctx, target| {
            field.render(rctx, target, &frame.field);
            handles.render(rctx, target, &frame, highlight);
        })
    }
}
