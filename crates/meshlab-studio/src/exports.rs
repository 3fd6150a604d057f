//! Export actions: take the session's frozen request, produce the artifact,
//! deliver it, and report back through the session's notices.

use meshlab_core::export::code::CodeBundle;
use meshlab_core::export::motion::motion_filename;
use meshlab_core::export::{
    css_fallback, export_stamp, export_still, motion_document, snapshot_artifact, Artifact,
    CodecSupport, EncoderFactory, ExportError, ExportRequest, ExportSink, RenderSurface, SceneTime,
    VideoJob, VideoProgress,
};
use meshlab_core::{Notice, Session};

use crate::clipboard::TextClipboard;
use crate::config::ExportKind;

/// Video frames captured per live frame.
pub const FRAMES_PER_STEP: u32 = 4;

type Outcome = Result<Option<String>, ExportError>;

pub struct Exporter {
    sink: Box<dyn ExportSink>,
    /// `None` when running without a desktop session.
    clipboard: Option<Box<dyn TextClipboard>>,
    codecs: Box<dyn CodecSupport>,
    encoders: Box<dyn EncoderFactory>,
}

impl Exporter {
    pub fn new(
        sink: Box<dyn ExportSink>,
        clipboard: Option<Box<dyn TextClipboard>>,
        codecs: Box<dyn CodecSupport>,
        encoders: Box<dyn EncoderFactory>,
    ) -> Self {
        Self {
            sink,
            clipboard,
            codecs,
            encoders,
        }
    }

    /// Runs one export against the session.
    ///
    /// Everything but video completes before this returns. A video export
    /// hands back a job to be driven with [`step`](Self::step); the session
    /// stays busy until it ends.
    pub fn start<S: RenderSurface + ?Sized>(
        &mut self,
        kind: ExportKind,
        session: &mut Session,
        surface: &mut S,
        time: SceneTime,
    ) -> Option<VideoJob> {
        let Ok(req) = session.begin_export(time, export_stamp()) else {
            log::debug!("{kind} export rejected: another export is running");
            return None;
        };
        log::info!("{kind} export started");

        let outcome = match kind {
            ExportKind::Video => return self.start_video(session, surface, req),
            ExportKind::Png => self.png(surface, &req),
            ExportKind::Code => self.code(&req),
            ExportKind::Motion => self.motion(&req),
            ExportKind::Json => self.json(&req),
            ExportKind::Css => self.css(&req),
        };
        session.finish_export(outcome);
        None
    }

    /// Captures the next slice of a running video. Returns `true` once the
    /// job is over, successfully or not.
    pub fn step<S: RenderSurface + ?Sized>(
        &mut self,
        job: &mut VideoJob,
        session: &mut Session,
        surface: &mut S,
    ) -> bool {
        match job.step(surface, FRAMES_PER_STEP) {
            Ok(VideoProgress::Running(_)) => false,
            Ok(VideoProgress::Finished(out)) => {
                session.finish_export(Ok(Some(format!(
                    "Saved {} ({} frames, {})",
                    out.location, out.frames, out.container.label
                ))));
                true
            }
            Err(e) => {
                session.finish_export(Err(e));
                true
            }
        }
    }

    // ── producers ─────────────────────────────────────────────────────────

    fn start_video<S: RenderSurface + ?Sized>(
        &mut self,
        session: &mut Session,
        surface: &mut S,
        req: ExportRequest,
    ) -> Option<VideoJob> {
        match VideoJob::start(surface, req, self.codecs.as_ref(), self.encoders.as_mut()) {
            Ok(Some(job)) => {
                session.notify(Notice::info(format!("Recording {}", job.filename())));
                Some(job)
            }
            Ok(None) => {
                session.finish_export(Ok(None));
                None
            }
            Err(e) => {
                session.finish_export(Err(e));
                None
            }
        }
    }

    fn png<S: RenderSurface + ?Sized>(&mut self, surface: &mut S, req: &ExportRequest) -> Outcome {
        let Some(img) = export_still(surface, req)? else {
            return Ok(None);
        };
        let at = self.sink.deliver(Artifact::new(img.filename, img.png))?;
        Ok(Some(format!("Saved {at}")))
    }

    fn code(&mut self, req: &ExportRequest) -> Outcome {
        let bundle = CodeBundle::generate(req)?;
        if let Some(cb) = self.clipboard.as_mut() {
            cb.set_text(bundle.concatenated())?;
        }
        for artifact in bundle.artifacts() {
            self.sink.deliver(artifact)?;
        }
        Ok(Some(match self.clipboard {
            Some(_) => format!("Code copied to clipboard and saved as {}.*", bundle.stem),
            None => format!("Code saved as {}.*", bundle.stem),
        }))
    }

    fn motion(&mut self, req: &ExportRequest) -> Outcome {
        let doc = motion_document(req);
        let at = self
            .sink
            .deliver(Artifact::new(motion_filename(req), doc.to_string()))?;
        Ok(Some(format!("Saved {at}")))
    }

    fn json(&mut self, req: &ExportRequest) -> Outcome {
        let at = self.sink.deliver(snapshot_artifact(req)?)?;
        Ok(Some(format!("Saved {at}")))
    }

    fn css(&mut self, req: &ExportRequest) -> Outcome {
        let css = css_fallback(&req.scene);
        match self.clipboard.as_mut() {
            Some(cb) => {
                cb.set_text(css)?;
                Ok(Some("CSS copied to clipboard".to_string()))
            }
            None => {
                let at = self
                    .sink
                    .deliver(Artifact::new(format!("meshlab-css-{}.css", req.stamp), css))?;
                Ok(Some(format!("Saved {at}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use meshlab_core::export::{EncodeSettings, FrameEncoder, SurfaceError, SurfaceSize};
    use meshlab_core::field::FieldFrame;
    use meshlab_core::NoticeLevel;

    // ── fakes ─────────────────────────────────────────────────────────────

    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<Artifact>>>);

    impl ExportSink for SharedSink {
        fn deliver(&mut self, artifact: Artifact) -> Result<String, ExportError> {
            let name = artifact.filename.clone();
            self.0.borrow_mut().push(artifact);
            Ok(format!("mem/{name}"))
        }
    }

    #[derive(Clone, Default)]
    struct FakeClipboard(Rc<RefCell<Option<String>>>);

    impl TextClipboard for FakeClipboard {
        fn set_text(&mut self, text: String) -> Result<(), ExportError> {
            *self.0.borrow_mut() = Some(text);
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl TextClipboard for BrokenClipboard {
        fn set_text(&mut self, _: String) -> Result<(), ExportError> {
            Err(ExportError::Clipboard("no display".into()))
        }
    }

    struct OnlyBaseline;

    impl CodecSupport for OnlyBaseline {
        fn supports(&self, codec: &str) -> bool {
            codec == "mpeg4"
        }
    }

    struct CountingEncoder(Rc<RefCell<u32>>);

    impl FrameEncoder for CountingEncoder {
        fn write_frame(&mut self, _: &[u8]) -> Result<(), ExportError> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<String, ExportError> {
            Ok("mem/clip.mp4".into())
        }
    }

    struct Encoders(Rc<RefCell<u32>>);

    impl EncoderFactory for Encoders {
        fn open(&mut self, _: &EncodeSettings) -> Result<Box<dyn FrameEncoder>, ExportError> {
            Ok(Box::new(CountingEncoder(self.0.clone())))
        }
    }

    /// Hands back blank frames of the right size without shading anything.
    struct BlankSurface {
        size: SurfaceSize,
        rendered: bool,
    }

    impl RenderSurface for BlankSurface {
        fn size(&self) -> SurfaceSize {
            self.size
        }
        fn set_size(&mut self, size: SurfaceSize) {
            self.size = size;
        }
        fn is_attached(&self) -> bool {
            true
        }
        fn render(&mut self, _: &FieldFrame) -> Result<(), SurfaceError> {
            self.rendered = true;
            Ok(())
        }
        fn read_rgba(&mut self) -> Result<Vec<u8>, SurfaceError> {
            let (w, h) = self.size.physical();
            Ok(vec![0; (w * h * 4) as usize])
        }
    }

    const LIVE: SurfaceSize = SurfaceSize::new(800, 600, 2.0);

    struct Rig {
        exporter: Exporter,
        sink: SharedSink,
        clipboard: FakeClipboard,
        frames: Rc<RefCell<u32>>,
        surface: BlankSurface,
    }

    fn rig(with_clipboard: bool) -> Rig {
        let sink = SharedSink::default();
        let clipboard = FakeClipboard::default();
        let frames = Rc::new(RefCell::new(0));
        let cb: Option<Box<dyn TextClipboard>> = with_clipboard.then(|| Box::new(clipboard.clone()) as Box<dyn TextClipboard>);
        Rig {
            exporter: Exporter::new(
                Box::new(sink.clone()),
                cb,
                Box::new(OnlyBaseline),
                Box::new(Encoders(frames.clone())),
            ),
            sink,
            clipboard,
            frames,
            surface: BlankSurface {
                size: LIVE,
                rendered: false,
            },
        }
    }

    fn last_notice(session: &mut Session) -> Notice {
        let mut notices = session.take_notices();
        notices.pop().unwrap()
    }

    // ── one-shot exports ──────────────────────────────────────────────────

    #[test]
    fn json_export_delivers_snapshot() {
        let mut r = rig(true);
        let mut s = Session::new();
        let job = r.exporter.start(ExportKind::Json, &mut s, &mut r.surface, SceneTime::default());
        assert!(job.is_none());
        assert!(!s.is_busy());

        let files = r.sink.0.borrow();
        assert_eq!(files.len(), 1);
        assert!(files[0].filename.starts_with("mesh-config-"), "{}", files[0].filename);
        let text = String::from_utf8(files[0].bytes.clone()).unwrap();
        assert!(text.contains("\"points\""));
        drop(files);

        let n = last_notice(&mut s);
        assert_eq!(n.level, NoticeLevel::Info);
        assert!(n.message.starts_with("Saved mem/"), "{}", n.message);
    }

    #[test]
    fn css_goes_to_clipboard_when_available() {
        let mut r = rig(true);
        let mut s = Session::new();
        r.exporter.start(ExportKind::Css, &mut s, &mut r.surface, SceneTime::default());
        let copied = r.clipboard.0.borrow().clone().unwrap();
        assert!(copied.contains("radial-gradient"));
        assert!(r.sink.0.borrow().is_empty());
    }

    #[test]
    fn css_is_written_to_a_file_without_clipboard() {
        let mut r = rig(false);
        let mut s = Session::new();
        r.exporter.start(ExportKind::Css, &mut s, &mut r.surface, SceneTime::default());
        let files = r.sink.0.borrow();
        assert_eq!(files.len(), 1);
        assert!(files[0].filename.ends_with(".css"));
    }

    #[test]
    fn code_bundle_is_copied_and_saved() {
        let mut r = rig(true);
        let mut s = Session::new();
        r.exporter.start(ExportKind::Code, &mut s, &mut r.surface, SceneTime::default());
        assert_eq!(r.sink.0.borrow().len(), 3);
        let copied = r.clipboard.0.borrow().clone().unwrap();
        assert!(copied.contains("three"), "bundle imports three.js");
    }

    #[test]
    fn motion_document_is_json() {
        let mut r = rig(true);
        let mut s = Session::new();
        r.exporter.start(ExportKind::Motion, &mut s, &mut r.surface, SceneTime::default());
        let files = r.sink.0.borrow();
        assert_eq!(files.len(), 1);
        let text = String::from_utf8(files[0].bytes.clone()).unwrap();
        assert!(text.contains("\"v\":\"5.7.4\""), "{}", &text[..80.min(text.len())]);
    }

    #[test]
    fn clipboard_failure_becomes_one_error_notice() {
        let mut r = rig(true);
        r.exporter.clipboard = Some(Box::new(BrokenClipboard));
        let mut s = Session::new();
        r.exporter.start(ExportKind::Css, &mut s, &mut r.surface, SceneTime::default());
        let notices = s.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(!s.is_busy());
    }

    // ── video ─────────────────────────────────────────────────────────────

    #[test]
    fn video_job_runs_to_completion_and_restores_surface() {
        let mut r = rig(true);
        let mut s = Session::new();
        let mut job = r
            .exporter
            .start(ExportKind::Video, &mut s, &mut r.surface, SceneTime::default())
            .unwrap();
        assert!(s.is_busy());
        assert!(job.filename().ends_with(".mp4"));
        assert_eq!(r.surface.size(), SurfaceSize::exact(1920, 1080));

        let mut steps = 0;
        while !r.exporter.step(&mut job, &mut s, &mut r.surface) {
            steps += 1;
            assert!(steps < 1000, "job never finished");
        }
        assert!(r.surface.rendered);
        assert_eq!(*r.frames.borrow(), 150);
        assert_eq!(r.surface.size(), LIVE);
        assert!(!s.is_busy());
        assert!(last_notice(&mut s).message.contains("mem/clip.mp4"));
    }

    #[test]
    fn exports_are_rejected_while_video_runs() {
        let mut r = rig(true);
        let mut s = Session::new();
        let _job = r
            .exporter
            .start(ExportKind::Video, &mut s, &mut r.surface, SceneTime::default())
            .unwrap();
        s.take_notices();

        assert!(r.exporter.start(ExportKind::Json, &mut s, &mut r.surface, SceneTime::default()).is_none());
        assert!(r.sink.0.borrow().is_empty());
        assert_eq!(last_notice(&mut s).level, NoticeLevel::Error);
        assert!(s.is_busy());
    }
}
