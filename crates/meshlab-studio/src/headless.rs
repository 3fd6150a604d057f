//! One export without a window, rendered on the CPU.

use anyhow::{bail, Result};

use meshlab_core::export::{FileSink, RasterSurface, SceneTime, SurfaceSize};
use meshlab_core::{NoticeLevel, Session};

use crate::config::{read_scene, ExportKind, StudioConfig};
use crate::exports::Exporter;
use crate::ffmpeg::{FfmpegCodecs, FfmpegEncoders};

/// Runs `kind` against the configured scene and export settings.
///
/// Files land in the export directory; an error notice fails the run.
pub fn run(config: &StudioConfig, kind: ExportKind) -> Result<()> {
    let mut session = match &config.scene {
        Some(path) => Session::from_snapshot(read_scene(path)?)?,
        None => Session::new(),
    };
    session.update_export_config(config.export_patch());

    let mut exporter = Exporter::new(
        Box::new(FileSink::new(&config.export_dir)),
        None,
        Box::new(FfmpegCodecs::probe(&config.ffmpeg)),
        Box::new(FfmpegEncoders::new(&config.ffmpeg, &config.export_dir)),
    );

    let (w, h) = session.export_config().target_size();
    let mut surface = RasterSurface::new(SurfaceSize::exact(w, h));

    log::info!("headless {kind} export at {w}x{h}");
    if let Some(mut job) = exporter.start(kind, &mut session, &mut surface, SceneTime::default()) {
        let mut reported = 0;
        while !exporter.step(&mut job, &mut session, &mut surface) {
            let pct = job.progress();
            if pct >= reported + 10 {
                log::info!("{} {pct}%", job.filename());
                reported = pct - pct % 10;
            }
        }
    }

    let mut failure = None;
    for notice in session.take_notices() {
        match notice.level {
            NoticeLevel::Info => println!("{}", notice.message),
            NoticeLevel::Error => failure = Some(notice.message),
        }
    }
    match failure {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(dir: &std::path::Path) -> StudioConfig {
        StudioConfig {
            export_dir: dir.to_path_buf(),
            ffmpeg: "/nonexistent/meshlab-ffmpeg".into(),
            ..StudioConfig::default()
        }
    }

    #[test]
    fn json_export_writes_into_export_dir() {
        let dir = std::env::temp_dir().join(format!("meshlab-headless-json-{}", std::process::id()));
        run(&config(&dir), ExportKind::Json).unwrap();

        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("mesh-config-"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn video_without_ffmpeg_fails() {
        let dir = std::env::temp_dir().join(format!("meshlab-headless-video-{}", std::process::id()));
        let err = run(&config(&dir), ExportKind::Video).unwrap_err();
        assert!(err.to_string().contains("Export failed"), "{err}");
        let _ = fs::remove_dir_all(&dir);
    }
}
