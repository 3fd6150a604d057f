use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::surface::{RenderSurface, SurfaceLease, SurfaceSize};
use super::{ExportError, ExportRequest};
use crate::render_loop::resolve_frame;

/// Encoded still, ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Unencoded readback of one export-sized frame.
#[derive(Debug)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Renders the request once at `base size × multiplier`.
///
/// Returns `Ok(None)` without touching the surface when there is nothing to
/// render or the surface is detached. The surface's size and pixel ratio are
/// restored before this returns, on every path.
pub fn render_still<S: RenderSurface + ?Sized>(
    surface: &mut S,
    req: &ExportRequest,
) -> Result<Option<RawImage>, ExportError> {
    if req.scene.points.is_empty() {
        log::debug!("still export skipped: scene has no points");
        return Ok(None);
    }
    if !surface.is_attached() {
        log::debug!("still export skipped: surface detached");
        return Ok(None);
    }

    let (width, height) = req.settings.target_size();
    let frame = resolve_frame(&req.scene.points, &req.scene.config, req.time, None);

    let mut lease = SurfaceLease::new(surface);
    lease.set_size(SurfaceSize::exact(width, height));
    lease.render(&frame)?;
    let rgba = lease.read_rgba()?;

    Ok(Some(RawImage {
        width,
        height,
        rgba,
    }))
}

pub fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, ExportError> {
    let img = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        ExportError::Image(format!("pixel buffer does not hold {width}x{height} RGBA"))
    })?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ExportError::Image(e.to_string()))?;
    Ok(out.into_inner())
}

/// Still-image export: render, read back, encode PNG.
pub fn export_still<S: RenderSurface + ?Sized>(
    surface: &mut S,
    req: &ExportRequest,
) -> Result<Option<StillImage>, ExportError> {
    let Some(raw) = render_still(surface, req)? else {
        return Ok(None);
    };
    log::info!("encoding {}x{} still", raw.width, raw.height);
    let png = encode_png(raw.width, raw.height, raw.rgba)?;
    Ok(Some(StillImage {
        filename: req.media_filename("png"),
        width: raw.width,
        height: raw.height,
        png,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::surface::{RasterSurface, SurfaceError};
    use crate::export::testing::{request, ProbeSurface};
    use crate::model::{ExportFormat, ExportPatch, MAX_MULTIPLIER, MIN_MULTIPLIER};

    #[test]
    fn restores_surface_for_every_format_and_multiplier() {
        let live = SurfaceSize::new(1280, 720, 1.5);
        for format in ExportFormat::ALL {
            for m in MIN_MULTIPLIER..=MAX_MULTIPLIER {
                let mut req = request();
                req.settings.apply(&ExportPatch {
                    format: Some(format),
                    multiplier: Some(m),
                    ..ExportPatch::default()
                });
                let mut surface = ProbeSurface::new(live);
                let raw = render_still(&mut surface, &req).unwrap().unwrap();

                let (bw, bh) = format.base_size();
                assert_eq!((raw.width, raw.height), (bw * m, bh * m));
                assert_eq!(surface.rendered_at, vec![SurfaceSize::exact(bw * m, bh * m)]);
                assert_eq!(surface.size(), live, "{format:?} {m}x");
            }
        }
    }

    #[test]
    fn restores_surface_after_readback_failure() {
        let live = SurfaceSize::new(300, 200, 2.0);
        let mut surface = ProbeSurface::new(live);
        surface.fail_readback = true;
        let err = export_still(&mut surface, &request()).unwrap_err();
        assert!(matches!(err, ExportError::Surface(SurfaceError::Readback(_))));
        assert_eq!(surface.size(), live);
    }

    #[test]
    fn detached_surface_is_a_silent_noop() {
        let live = SurfaceSize::new(300, 200, 1.0);
        let mut surface = RasterSurface::detached(live);
        assert!(export_still(&mut surface, &request()).unwrap().is_none());
        assert_eq!(surface.size(), live);
    }

    #[test]
    fn empty_scene_is_a_silent_noop() {
        let mut req = request();
        req.scene.points.clear();
        let mut surface = ProbeSurface::new(SurfaceSize::exact(10, 10));
        assert!(export_still(&mut surface, &req).unwrap().is_none());
        assert!(surface.rendered_at.is_empty());
    }

    #[test]
    fn cpu_export_produces_png_of_target_size() {
        let mut req = request();
        // Skip the warp so the full-resolution raster stays quick.
        req.scene.config.warp = 0.0;
        req.settings.apply(&ExportPatch {
            format: Some(ExportFormat::Square),
            ..ExportPatch::default()
        });
        let live = SurfaceSize::new(64, 64, 2.0);
        let mut surface = RasterSurface::new(live);

        let still = export_still(&mut surface, &req).unwrap().unwrap();
        assert_eq!(still.filename, "meshlab-square-1x-1700000000000.png");
        assert_eq!(&still.png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&still.png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1080, 1080));
        assert_eq!(surface.size(), live);
    }

    #[test]
    fn encode_rejects_short_buffers() {
        assert!(matches!(encode_png(4, 4, vec![0; 10]), Err(ExportError::Image(_))));
    }
}
