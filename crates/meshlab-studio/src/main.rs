mod clipboard;
mod config;
mod exports;
mod ffmpeg;
mod headless;
mod keymap;
mod studio;

use anyhow::Result;
use clap::Parser;

use meshlab_core::export::FileSink;
use meshlab_core::Session;
use meshlab_engine::device::GpuInit;
use meshlab_engine::logging::{init_logging, LoggingConfig};
use meshlab_engine::window::{Runtime, RuntimeConfig};

use crate::clipboard::SystemClipboard;
use crate::config::{read_scene, StudioConfig};
use crate::exports::Exporter;
use crate::ffmpeg::{FfmpegCodecs, FfmpegEncoders};
use crate::studio::{Studio, TITLE};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = StudioConfig::parse();

    if let Some(kind) = config.headless {
        return headless::run(&config, kind);
    }

    let mut session = match &config.scene {
        Some(path) => Session::from_snapshot(read_scene(path)?)?,
        None => Session::new(),
    };
    session.update_export_config(config.export_patch());

    let codecs = FfmpegCodecs::probe(&config.ffmpeg);
    let exporter = Exporter::new(
        Box::new(FileSink::new(&config.export_dir)),
        Some(Box::new(SystemClipboard::new())),
        Box::new(codecs),
        Box::new(FfmpegEncoders::new(&config.ffmpeg, &config.export_dir)),
    );
    log::info!("exports go to {}", config.export_dir.display());

    let runtime = RuntimeConfig {
        title: TITLE.to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(runtime, GpuInit::default(), Studio::new(config, session, exporter))
}
