//! Export pipeline.
//!
//! Every producer starts from an [`ExportRequest`]: a frozen copy of the
//! scene taken by [`Session::begin_export`](crate::session::Session::begin_export).
//! Raster and video output go through a [`RenderSurface`]; the text formats
//! (snapshot JSON, motion document, code bundle) are pure functions of the
//! request.

pub mod code;
pub mod motion;
pub mod still;
pub mod surface;
pub mod video;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::ExportConfig;
use crate::snapshot::{SceneSnapshot, SnapshotError};

pub use code::{css_fallback, CodeBundle};
pub use motion::motion_document;
pub use still::{export_still, StillImage};
pub use surface::{RasterSurface, RenderSurface, SurfaceError, SurfaceLease, SurfaceSize};
pub use video::{
    negotiate, CodecSupport, EncodeSettings, EncoderFactory, FrameEncoder, VideoContainer, VideoJob, VideoOutput,
    VideoProgress, CONTAINER_PREFERENCE, VIDEO_FPS,
};

/// The two clocks a frame depends on.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SceneTime {
    /// Time fed to the shader; frozen while the scene is paused.
    pub shader_time: f32,
    /// Seconds since the live loop started; drives drift.
    pub elapsed: f64,
}

/// Everything an export needs, captured once when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub scene: SceneSnapshot,
    pub settings: ExportConfig,
    pub time: SceneTime,
    /// Milliseconds since the Unix epoch, embedded in filenames.
    pub stamp: u64,
}

impl ExportRequest {
    /// `meshlab-<format>-<mult>x-<stamp>.<ext>`
    pub fn media_filename(&self, extension: &str) -> String {
        format!(
            "meshlab-{}-{}x-{}.{}",
            self.settings.format.name(),
            self.settings.multiplier,
            self.stamp,
            extension
        )
    }
}

/// Milliseconds since the Unix epoch.
pub fn export_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug)]
pub enum ExportError {
    /// Another export holds the surface.
    Busy,
    Surface(SurfaceError),
    Image(String),
    Encoder(String),
    Io(io::Error),
    Clipboard(String),
    Snapshot(SnapshotError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Busy => write!(f, "another export is in progress"),
            ExportError::Surface(e) => write!(f, "{e}"),
            ExportError::Image(m) => write!(f, "image encoding failed: {m}"),
            ExportError::Encoder(m) => write!(f, "video encoder failed: {m}"),
            ExportError::Io(e) => write!(f, "write failed: {e}"),
            ExportError::Clipboard(m) => write!(f, "clipboard unavailable: {m}"),
            ExportError::Snapshot(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Surface(e) => Some(e),
            ExportError::Io(e) => Some(e),
            ExportError::Snapshot(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfaceError> for ExportError {
    fn from(e: SurfaceError) -> Self {
        ExportError::Surface(e)
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<SnapshotError> for ExportError {
    fn from(e: SnapshotError) -> Self {
        ExportError::Snapshot(e)
    }
}

/// A finished export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Where finished artifacts end up.
pub trait ExportSink {
    /// Stores the artifact and returns a human-readable location.
    fn deliver(&mut self, artifact: Artifact) -> Result<String, ExportError>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for FileSink {
    fn deliver(&mut self, artifact: Artifact) -> Result<String, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.filename);
        fs::write(&path, &artifact.bytes)?;
        log::info!("wrote {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(path.display().to_string())
    }
}

/// Collects artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<Artifact>,
}

impl ExportSink for MemorySink {
    fn deliver(&mut self, artifact: Artifact) -> Result<String, ExportError> {
        let name = artifact.filename.clone();
        self.artifacts.push(artifact);
        Ok(name)
    }
}

/// Scene document as a downloadable artifact.
pub fn snapshot_artifact(req: &ExportRequest) -> Result<Artifact, ExportError> {
    let json = req.scene.to_json()?;
    Ok(Artifact::new(SceneSnapshot::filename(req.stamp), json))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportFormat, ExportPatch};

    #[test]
    fn media_filename_embeds_format_multiplier_and_stamp() {
        let mut req = testing::request();
        req.settings.apply(&ExportPatch {
            format: Some(ExportFormat::Portrait),
            multiplier: Some(3),
            ..ExportPatch::default()
        });
        assert_eq!(req.media_filename("png"), "meshlab-portrait-3x-1700000000000.png");
    }

    #[test]
    fn snapshot_artifact_is_loadable() {
        let req = testing::request();
        let a = snapshot_artifact(&req).unwrap();
        assert_eq!(a.filename, "mesh-config-1700000000000.json");
        let text = String::from_utf8(a.bytes).unwrap();
        assert_eq!(SceneSnapshot::from_json(&text).unwrap(), req.scene);
    }

    #[test]
    fn file_sink_creates_directory() {
        let dir = std::env::temp_dir().join(format!("meshlab-sink-{}", std::process::id()));
        let mut sink = FileSink::new(&dir);
        let loc = sink.deliver(Artifact::new("a.txt", "hello")).unwrap();
        assert!(loc.ends_with("a.txt"));
        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "hello");
        let _ = fs::remove_dir_all(&dir);
    }
}
