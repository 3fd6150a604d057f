use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::field::{rasterize, FieldFrame};

/// Logical size plus device pixel ratio of a render surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Size at which exports render: one texel per output pixel.
    pub const fn exact(width: u32, height: u32) -> Self {
        Self::new(width, height, 1.0)
    }

    /// Backing resolution in device pixels, at least 1×1.
    pub fn physical(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// No render context is attached yet (or it was lost).
    Detached,
    Render(String),
    Readback(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Detached => write!(f, "render surface is not attached"),
            SurfaceError::Render(m) => write!(f, "render failed: {m}"),
            SurfaceError::Readback(m) => write!(f, "pixel readback failed: {m}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Something the field can be rendered into and read back from.
///
/// The live preview and every export share one surface; exports take it
/// through a [`SurfaceLease`].
pub trait RenderSurface {
    fn size(&self) -> SurfaceSize;

    fn set_size(&mut self, size: SurfaceSize);

    fn is_attached(&self) -> bool;

    fn render(&mut self, frame: &FieldFrame) -> Result<(), SurfaceError>;

    /// Tightly packed RGBA8 of the last render, rows top to bottom, at
    /// [`SurfaceSize::physical`] resolution.
    fn read_rgba(&mut self) -> Result<Vec<u8>, SurfaceError>;
}

/// Exclusive hold on a surface for the duration of an export.
///
/// Size and pixel ratio captured at construction are written back on drop,
/// whether the export finished or bailed out with an error.
pub struct SurfaceLease<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    saved: SurfaceSize,
    armed: bool,
}

impl<'a, S: RenderSurface + ?Sized> SurfaceLease<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let saved = surface.size();
        Self {
            surface,
            saved,
            armed: true,
        }
    }

    /// Resumes a lease whose original size was captured earlier, e.g. by a
    /// job that spans several frames.
    pub fn resume(surface: &'a mut S, saved: SurfaceSize) -> Self {
        Self {
            surface,
            saved,
            armed: true,
        }
    }

    pub fn saved(&self) -> SurfaceSize {
        self.saved
    }

    /// Ends this borrow without restoring; the owner will resume it later.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl<S: RenderSurface + ?Sized> Deref for SurfaceLease<'_, S> {
    type Target = S;
    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for SurfaceLease<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for SurfaceLease<'_, S> {
    fn drop(&mut self) {
        if self.armed && self.surface.size() != self.saved {
            log::debug!("restoring surface to {:?}", self.saved);
            self.surface.set_size(self.saved);
        }
    }
}

/// CPU surface backed by [`rasterize`]. Used for headless export and tests.
#[derive(Debug)]
pub struct RasterSurface {
    size: SurfaceSize,
    pixels: Vec<u8>,
    attached: bool,
}

impl RasterSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            pixels: Vec::new(),
            attached: true,
        }
    }

    /// A surface that reports itself as not ready.
    pub fn detached(size: SurfaceSize) -> Self {
        Self {
            attached: false,
            ..Self::new(size)
        }
    }
}

impl RenderSurface for RasterSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        if size != self.size {
            self.size = size;
            self.pixels.clear();
        }
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn render(&mut self, frame: &FieldFrame) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(SurfaceError::Detached);
        }
        let (w, h) = self.size.physical();
        self.pixels = rasterize(frame, w, h);
        Ok(())
    }

    fn read_rgba(&mut self) -> Result<Vec<u8>, SurfaceError> {
        if self.pixels.is_empty() {
            return Err(SurfaceError::Readback("nothing rendered at current size".into()));
        }
        Ok(self.pixels.clone())
    }
}
