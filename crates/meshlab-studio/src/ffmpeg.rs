//! Video encoding through an external `ffmpeg` process.
//!
//! Frames go to ffmpeg's stdin as raw RGBA; ffmpeg writes the container file
//! straight into the export directory.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use meshlab_core::export::{CodecSupport, EncodeSettings, EncoderFactory, ExportError, FrameEncoder};

// ── capability probe ──────────────────────────────────────────────────────

/// Encoders reported by `ffmpeg -encoders`.
#[derive(Debug, Default, Clone)]
pub struct FfmpegCodecs {
    names: HashSet<String>,
}

impl FfmpegCodecs {
    /// Asks the binary which encoders it was built with. A missing or broken
    /// binary yields an empty set.
    pub fn probe(binary: &Path) -> Self {
        let output = Command::new(binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let codecs = Self::parse(&String::from_utf8_lossy(&out.stdout));
                log::debug!("{} reports {} encoders", binary.display(), codecs.names.len());
                codecs
            }
            Ok(out) => {
                log::debug!("{} -encoders exited with {}", binary.display(), out.status);
                Self::default()
            }
            Err(e) => {
                log::debug!("cannot run {}: {e}", binary.display());
                Self::default()
            }
        }
    }

    /// Parses the encoder table: a legend, a `------` rule, then one
    /// `FLAGS name description` row per encoder.
    pub fn parse(listing: &str) -> Self {
        let names = listing
            .lines()
            .skip_while(|l| l.trim() != "------")
            .skip(1)
            .filter_map(|l| {
                let mut cols = l.split_whitespace();
                let flags = cols.next()?;
                let name = cols.next()?;
                flags.starts_with('V').then(|| name.to_string())
            })
            .collect();
        Self { names }
    }
}

impl CodecSupport for FfmpegCodecs {
    fn supports(&self, codec: &str) -> bool {
        self.names.contains(codec)
    }
}

// ── encoder ───────────────────────────────────────────────────────────────

/// Opens one ffmpeg process per video export.
#[derive(Debug, Clone)]
pub struct FfmpegEncoders {
    binary: PathBuf,
    out_dir: PathBuf,
}

impl FfmpegEncoders {
    pub fn new(binary: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            out_dir: out_dir.into(),
        }
    }
}

impl EncoderFactory for FfmpegEncoders {
    fn open(&mut self, settings: &EncodeSettings) -> Result<Box<dyn FrameEncoder>, ExportError> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(&settings.filename);

        let mut child = Command::new(&self.binary)
            .args(encode_args(settings))
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Encoder(format!("cannot start {}: {e}", self.binary.display())))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExportError::Encoder("ffmpeg stdin unavailable".into()))?;

        log::debug!("ffmpeg started for {}", path.display());
        Ok(Box::new(FfmpegEncoder {
            child: Some(child),
            stdin: Some(stdin),
            frame_len: settings.width as usize * settings.height as usize * 4,
            path,
        }))
    }
}

/// Command line for one encode, minus the output path.
pub fn encode_args(settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("{}x{}", settings.width, settings.height));
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    args.extend(["-i", "-", "-an", "-c:v", settings.container.codec].map(String::from));

    let quality: &[&str] = match settings.container.codec {
        "libx264" => &["-preset", "medium", "-crf", "18"],
        "libvpx-vp9" => &["-b:v", "0", "-crf", "30"],
        "libvpx" => &["-b:v", "8M"],
        _ => &["-q:v", "3"],
    };
    args.extend(quality.iter().map(|s| s.to_string()));

    // 4:2:0 chroma needs even dimensions.
    if settings.width % 2 == 1 || settings.height % 2 == 1 {
        args.extend(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"].map(String::from));
    }
    args.extend(["-pix_fmt", "yuv420p"].map(String::from));

    if settings.container.extension == "mp4" {
        args.extend(["-movflags", "+faststart"].map(String::from));
    }
    args
}

struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frame_len: usize,
    path: PathBuf,
}

impl FrameEncoder for FfmpegEncoder {
    fn write_frame(&mut self, rgba: &[u8]) -> Result<(), ExportError> {
        if rgba.len() != self.frame_len {
            return Err(ExportError::Encoder(format!(
                "frame is {} bytes, expected {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ExportError::Encoder("ffmpeg input already closed".into()));
        };
        stdin
            .write_all(rgba)
            .map_err(|e| ExportError::Encoder(format!("ffmpeg stopped accepting frames: {e}")))
    }

    fn finish(mut self: Box<Self>) -> Result<String, ExportError> {
        // Closing stdin is ffmpeg's end-of-stream.
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Err(ExportError::Encoder("ffmpeg already reaped".into()));
        };
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(ExportError::Encoder(format!("ffmpeg exited with {}: {stderr}", output.status)));
        }
        Ok(self.path.display().to_string())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            log::debug!("abandoning ffmpeg for {}", self.path.display());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlab_core::export::video::{H264_MP4, MPEG4_MP4, VP9_WEBM};
    use meshlab_core::export::VideoContainer;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D mpeg4                MPEG-4 part 2
 A....D aac                  AAC (Advanced Audio Coding)
";

    fn settings(container: VideoContainer, w: u32, h: u32) -> EncodeSettings {
        EncodeSettings {
            container,
            width: w,
            height: h,
            fps: 30,
            filename: format!("clip.{}", container.extension),
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    // ── probe ─────────────────────────────────────────────────────────────

    #[test]
    fn parses_video_encoders_after_rule() {
        let c = FfmpegCodecs::parse(LISTING);
        assert!(c.supports("libx264"));
        assert!(c.supports("mpeg4"));
        assert!(!c.supports("aac"), "audio encoders are not video codecs");
        assert!(!c.supports("Video"), "legend rows are skipped");
    }

    #[test]
    fn garbage_listing_supports_nothing() {
        assert!(!FfmpegCodecs::parse("ffmpeg: not found").supports("mpeg4"));
    }

    // ── command line ──────────────────────────────────────────────────────

    #[test]
    fn mp4_args_stream_rgba_from_stdin() {
        let args = encode_args(&settings(H264_MP4, 1920, 1080));
        assert!(has_pair(&args, "-pix_fmt", "rgba"));
        assert!(has_pair(&args, "-s", "1920x1080"));
        assert!(has_pair(&args, "-r", "30"));
        assert!(has_pair(&args, "-i", "-"));
        assert!(has_pair(&args, "-c:v", "libx264"));
        assert!(has_pair(&args, "-pix_fmt", "yuv420p"));
        assert!(has_pair(&args, "-movflags", "+faststart"));
        assert!(!args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn webm_skips_faststart() {
        let args = encode_args(&settings(VP9_WEBM, 1080, 1080));
        assert!(has_pair(&args, "-c:v", "libvpx-vp9"));
        assert!(!args.iter().any(|a| a == "-movflags"));
    }

    #[test]
    fn odd_sizes_are_padded() {
        let args = encode_args(&settings(MPEG4_MP4, 1081, 720));
        assert!(has_pair(&args, "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"));
    }

    #[test]
    fn missing_binary_fails_to_open() {
        let dir = std::env::temp_dir().join("meshlab-ffmpeg-missing");
        let mut f = FfmpegEncoders::new("/nonexistent/meshlab-ffmpeg", &dir);
        let err = f.open(&settings(MPEG4_MP4, 4, 4)).err();
        assert!(matches!(err, Some(ExportError::Encoder(_))), "{err:?}");
        let _ = fs::remove_dir_all(&dir);
    }
}
