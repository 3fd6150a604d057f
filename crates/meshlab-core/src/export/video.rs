//! Video capture.
//!
//! Container choice is data-driven: an ordered preference list resolved
//! against a [`CodecSupport`] query, with a baseline entry that is assumed to
//! exist everywhere. Capture itself is a [`VideoJob`] stepped a few frames at
//! a time from the host's frame loop.

use super::surface::{RenderSurface, SurfaceLease, SurfaceSize};
use super::{ExportError, ExportRequest, SceneTime};
use crate::render_loop::resolve_frame;

pub const VIDEO_FPS: u32 = 30;

/// One encodable output format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoContainer {
    pub label: &'static str,
    /// Encoder name as understood by the capture backend (ffmpeg `-c:v`).
    pub codec: &'static str,
    pub extension: &'static str,
    pub mime: &'static str,
}

pub const H264_MP4: VideoContainer = VideoContainer {
    label: "H.264 / MP4",
    codec: "libx264",
    extension: "mp4",
    mime: "video/mp4; codecs=avc1",
};

pub const VP9_WEBM: VideoContainer = VideoContainer {
    label: "VP9 / WebM",
    codec: "libvpx-vp9",
    extension: "webm",
    mime: "video/webm; codecs=vp9",
};

pub const VP8_WEBM: VideoContainer = VideoContainer {
    label: "VP8 / WebM",
    codec: "libvpx",
    extension: "webm",
    mime: "video/webm; codecs=vp8",
};

/// Built into every ffmpeg; the last resort.
pub const MPEG4_MP4: VideoContainer = VideoContainer {
    label: "MPEG-4 Part 2 / MP4",
    codec: "mpeg4",
    extension: "mp4",
    mime: "video/mp4",
};

/// Most widely playable first.
pub const CONTAINER_PREFERENCE: [VideoContainer; 4] = [H264_MP4, VP9_WEBM, VP8_WEBM, MPEG4_MP4];

pub const BASELINE_CONTAINER: VideoContainer = MPEG4_MP4;

/// Runtime capability query.
pub trait CodecSupport {
    fn supports(&self, codec: &str) -> bool;
}

/// Every preference entry the runtime claims to support, in order, always
/// ending with the baseline.
pub fn candidates(preference: &[VideoContainer], support: &dyn CodecSupport) -> Vec<VideoContainer> {
    let mut out: Vec<VideoContainer> = preference
        .iter()
        .copied()
        .filter(|c| support.supports(c.codec))
        .collect();
    if !out.contains(&BASELINE_CONTAINER) {
        out.push(BASELINE_CONTAINER);
    }
    out
}

/// First supported container, or the baseline.
pub fn negotiate(preference: &[VideoContainer], support: &dyn CodecSupport) -> VideoContainer {
    candidates(preference, support)
        .first()
        .copied()
        .unwrap_or(BASELINE_CONTAINER)
}

/// Parameters handed to an encoder backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub container: VideoContainer,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub filename: String,
}

/// Accepts raw frames and produces one encoded file.
pub trait FrameEncoder {
    /// `rgba` is tightly packed, rows top to bottom.
    fn write_frame(&mut self, rgba: &[u8]) -> Result<(), ExportError>;

    /// Flushes and closes the output. Returns where the file ended up.
    fn finish(self: Box<Self>) -> Result<String, ExportError>;
}

pub trait EncoderFactory {
    /// Fails when the backend cannot produce `settings.container`; the job
    /// then moves on to the next candidate.
    fn open(&mut self, settings: &EncodeSettings) -> Result<Box<dyn FrameEncoder>, ExportError>;
}

fn capture_time(req: &ExportRequest, index: u32) -> SceneTime {
    let t = f64::from(index) / f64::from(VIDEO_FPS);
    let shader_time = if req.scene.config.is_animated {
        t as f32
    } else {
        req.time.shader_time
    };
    SceneTime {
        shader_time,
        elapsed: t,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutput {
    pub filename: String,
    pub location: String,
    pub container: VideoContainer,
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoProgress {
    /// Percentage of frames captured so far, 0 to 99.
    Running(u8),
    Finished(VideoOutput),
}

/// A capture in flight.
///
/// Holds the surface at export size between steps; the host keeps the live
/// preview off the surface until the job finishes. Every exit path (finish,
/// encoder failure, [`abort`](Self::abort)) restores the surface's original
/// size and pixel ratio.
pub struct VideoJob {
    req: ExportRequest,
    settings: EncodeSettings,
    encoder: Option<Box<dyn FrameEncoder>>,
    saved: SurfaceSize,
    next_frame: u32,
    total_frames: u32,
}

impl VideoJob {
    /// Negotiates a container, opens an encoder and takes the surface.
    ///
    /// `Ok(None)` means there was nothing to do (empty scene or detached
    /// surface) and nothing was touched.
    pub fn start<S: RenderSurface + ?Sized>(
        surface: &mut S,
        req: ExportRequest,
        support: &dyn CodecSupport,
        encoders: &mut dyn EncoderFactory,
    ) -> Result<Option<Self>, ExportError> {
        if req.scene.points.is_empty() {
            log::debug!("video export skipped: scene has no points");
            return Ok(None);
        }
        if !surface.is_attached() {
            log::debug!("video export skipped: surface detached");
            return Ok(None);
        }

        let (width, height) = req.settings.target_size();
        let total_frames = VIDEO_FPS * req.settings.duration.seconds();

        let mut last_err = None;
        for container in candidates(&CONTAINER_PREFERENCE, support) {
            let settings = EncodeSettings {
                container,
                width,
                height,
                fps: VIDEO_FPS,
                filename: req.media_filename(container.extension),
            };
            match encoders.open(&settings) {
                Ok(encoder) => {
                    log::info!(
                        "recording {total_frames} frames at {width}x{height} as {}",
                        container.label
                    );
                    let mut lease = SurfaceLease::new(surface);
                    let saved = lease.saved();
                    lease.set_size(SurfaceSize::exact(width, height));
                    lease.keep();
                    return Ok(Some(Self {
                        req,
                        settings,
                        encoder: Some(encoder),
                        saved,
                        next_frame: 0,
                        total_frames,
                    }));
                }
                Err(e) => {
                    log::info!("{} unavailable ({e}); trying next container", container.label);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ExportError::Encoder("no video container available".into())))
    }

    pub fn container(&self) -> VideoContainer {
        self.settings.container
    }

    pub fn filename(&self) -> &str {
        &self.settings.filename
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Whole-percent progress.
    pub fn progress(&self) -> u8 {
        (u64::from(self.next_frame) * 100 / u64::from(self.total_frames.max(1))) as u8
    }

    /// Scene time of frame `index`: `index / fps` seconds into the capture.
    /// A paused scene keeps the shader time it had when the export started.
    pub fn frame_time(&self, index: u32) -> SceneTime {
        capture_time(&self.req, index)
    }

    /// Captures up to `budget` frames.
    pub fn step<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        budget: u32,
    ) -> Result<VideoProgress, ExportError> {
        let mut lease = SurfaceLease::resume(surface, self.saved);
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(ExportError::Encoder("capture already ended".into()));
        };

        lease.set_size(SurfaceSize::exact(self.settings.width, self.settings.height));
        let end = (self.next_frame + budget.max(1)).min(self.total_frames);
        while self.next_frame < end {
            let time = capture_time(&self.req, self.next_frame);
            let frame = resolve_frame(&self.req.scene.points, &self.req.scene.config, time, None);
            let captured = lease
                .render(&frame)
                .and_then(|_| lease.read_rgba())
                .map_err(ExportError::from)
                .and_then(|rgba| encoder.write_frame(&rgba));
            if let Err(e) = captured {
                self.encoder = None;
                return Err(e);
            }
            self.next_frame += 1;
        }

        if self.next_frame < self.total_frames {
            lease.keep();
            return Ok(VideoProgress::Running(self.progress()));
        }

        let Some(encoder) = self.encoder.take() else {
            return Err(ExportError::Encoder("capture already ended".into()));
        };
        let location = encoder.finish()?;
        log::info!("video written to {location}");
        Ok(VideoProgress::Finished(VideoOutput {
            filename: self.settings.filename.clone(),
            location,
            container: self.settings.container,
            frames: self.total_frames,
        }))
    }

    /// Stops the capture and gives the surface back. The partial file is
    /// left to the encoder backend.
    pub fn abort<S: RenderSurface + ?Sized>(mut self, surface: &mut S) {
        self.encoder = None;
        drop(SurfaceLease::resume(surface, self.saved));
    }
}
