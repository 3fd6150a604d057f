use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use meshlab_core::SceneSnapshot;
use meshlab_core::model::{ExportDuration, ExportFormat, ExportPatch, MAX_MULTIPLIER, MIN_MULTIPLIER};

pub const EXPORT_DIR_VAR: &str = "MESHLAB_EXPORT_DIR";
pub const FFMPEG_VAR: &str = "MESHLAB_FFMPEG";

const DEFAULT_EXPORT_DIR: &str = "meshlab-exports";
const DEFAULT_FFMPEG: &str = "ffmpeg";

/// One export action, as bound to a key or passed on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Png,
    Video,
    Code,
    Motion,
    Json,
    Css,
}

impl ExportKind {
    pub const ALL: [ExportKind; 6] = [
        ExportKind::Png,
        ExportKind::Video,
        ExportKind::Code,
        ExportKind::Motion,
        ExportKind::Json,
        ExportKind::Css,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportKind::Png => "png",
            ExportKind::Video => "video",
            ExportKind::Code => "code",
            ExportKind::Motion => "motion",
            ExportKind::Json => "json",
            ExportKind::Css => "css",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Landscape,
    Square,
    Portrait,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Landscape => ExportFormat::Landscape,
            FormatArg::Square => ExportFormat::Square,
            FormatArg::Portrait => ExportFormat::Portrait,
        }
    }
}

/// Clip length in seconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DurationArg {
    #[value(name = "5")]
    Five,
    #[value(name = "10")]
    Ten,
    #[value(name = "15")]
    Fifteen,
}

impl From<DurationArg> for ExportDuration {
    fn from(d: DurationArg) -> Self {
        match d {
            DurationArg::Five => ExportDuration::Five,
            DurationArg::Ten => ExportDuration::Ten,
            DurationArg::Fifteen => ExportDuration::Fifteen,
        }
    }
}

/// Everything the studio reads from its environment at startup.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "meshlab")]
#[command(about = "Mesh gradient editor; without --export the editor window opens", long_about = None)]
pub struct StudioConfig {
    /// Scene document to open instead of the default scene.
    #[arg(value_name = "SCENE.json")]
    pub scene: Option<PathBuf>,

    /// Run one export without a window, then exit.
    #[arg(long = "export", value_name = "KIND", value_enum, ignore_case = true)]
    pub headless: Option<ExportKind>,

    /// Where exports are written.
    #[arg(long = "out", value_name = "DIR", env = EXPORT_DIR_VAR, default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    /// ffmpeg binary used for video.
    #[arg(long, value_name = "PATH", env = FFMPEG_VAR, default_value = DEFAULT_FFMPEG)]
    pub ffmpeg: PathBuf,

    #[arg(long, value_enum, ignore_case = true)]
    pub format: Option<FormatArg>,

    /// Resolution multiplier.
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(i64::from(MIN_MULTIPLIER)..=i64::from(MAX_MULTIPLIER))
    )]
    pub scale: Option<u32>,

    #[arg(long, value_enum)]
    pub duration: Option<DurationArg>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            scene: None,
            headless: None,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            format: None,
            scale: None,
            duration: None,
        }
    }
}

impl StudioConfig {
    /// Export settings given on the command line.
    pub fn export_patch(&self) -> ExportPatch {
        ExportPatch {
            format: self.format.map(Into::into),
            multiplier: self.scale,
            duration: self.duration.map(Into::into),
        }
    }
}

/// Reads and validates a scene document.
pub fn read_scene(path: &Path) -> Result<SceneSnapshot> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    SceneSnapshot::from_json(&text).with_context(|| format!("{} is not a valid scene", path.display()))
}
