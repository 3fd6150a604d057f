//! GPU-backed [`RenderSurface`] for exports.
//!
//! Renders the field into an `Rgba8Unorm` texture and copies it back through
//! a mappable buffer. The texture is (re)built lazily at the surface's
//! physical size, so resizing is free until the next render.

use std::sync::mpsc;

use meshlab_core::export::{RenderSurface, SurfaceError, SurfaceSize};
use meshlab_core::field::FieldFrame;
use meshlab_core::Viewport;

use crate::render::{FieldRenderer, RenderCtx, RenderTarget};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Target {
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
}

pub struct OffscreenSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    field: FieldRenderer,
    size: SurfaceSize,
    target: Option<Target>,
    rendered: bool,
}

impl OffscreenSurface {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, size: SurfaceSize) -> Self {
        Self {
            device,
            queue,
            field: FieldRenderer::new(),
            size,
            target: None,
            rendered: false,
        }
    }

    fn ensure_target(&mut self) -> Result<&Target, SurfaceError> {
        let (width, height) = self.size.physical();
        let stale = self
            .target
            .as_ref()
            .is_none_or(|t| t.width != width || t.height != height);

        if stale {
            let limit = self.device.limits().max_texture_dimension_2d;
            if width > limit || height > limit {
                return Err(SurfaceError::Render(format!(
                    "{width}x{height} exceeds the device texture limit of {limit}"
                )));
            }
            log::debug!("offscreen target {width}x{height}");
            self.target = Some(create_target(&self.device, width, height)?);
        }

        self.target
            .as_ref()
            .ok_or_else(|| SurfaceError::Render("offscreen target missing".into()))
    }
}

impl RenderSurface for OffscreenSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        if size != self.size {
            self.size = size;
            self.rendered = false;
        }
    }

    fn is_attached(&self) -> bool {
        true
    }

    fn render(&mut self, frame: &FieldFrame) -> Result<(), SurfaceError> {
        self.rendered = false;
        self.ensure_target()?;
        let Some(target) = self.target.as_ref() else {
            return Err(SurfaceError::Detached);
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("meshlab offscreen encoder"),
            });

        let ctx = RenderCtx::new(
            &self.device,
            &self.queue,
            FORMAT,
            Viewport::new(self.size.width as f32, self.size.height as f32),
            self.size.pixel_ratio,
        );
        {
            let mut rt = RenderTarget::new(&mut encoder, &target.view);
            self.field.render(&ctx, &mut rt, frame);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(Some(encoder.finish()));
        self.rendered = true;
        Ok(())
    }

    fn read_rgba(&mut self) -> Result<Vec<u8>, SurfaceError> {
        if !self.rendered {
            return Err(SurfaceError::Readback("nothing rendered at current size".into()));
        }
        let Some(target) = self.target.as_ref() else {
            return Err(SurfaceError::Readback("no offscreen target".into()));
        };

        let slice = target.readback.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| SurfaceError::Readback(e.to_string()))?;

        receiver
            .recv()
            .map_err(|_| SurfaceError::Readback("map callback never ran".into()))?
            .map_err(|e| SurfaceError::Readback(e.to_string()))?;

        let frame = {
            let mapped = slice.get_mapped_range();
            copy_tight_rows(
                &mapped,
                target.unpadded_bytes_per_row,
                target.padded_bytes_per_row,
                target.height,
            )
        };
        target.readback.unmap();
        frame
    }
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> Result<Target, SurfaceError> {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("meshlab offscreen texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let unpadded_bytes_per_row = width
        .checked_mul(4)
        .ok_or_else(|| SurfaceError::Render(format!("row size overflows for width {width}")))?;
    let padded_bytes_per_row = align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("meshlab offscreen readback"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    Ok(Target {
        width,
        height,
        texture,
        view,
        readback,
        unpadded_bytes_per_row,
        padded_bytes_per_row,
    })
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn copy_tight_rows(
    mapped: &[u8],
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    height: u32,
) -> Result<Vec<u8>, SurfaceError> {
    let (row, stride) = (unpadded_bytes_per_row as usize, padded_bytes_per_row as usize);
    let required = stride * height as usize;
    if mapped.len() < required {
        return Err(SurfaceError::Readback(format!(
            "mapped frame too small: expected at least {required} bytes, got {}",
            mapped.len()
        )));
    }

    let mut frame = Vec::with_capacity(row * height as usize);
    for chunk in mapped.chunks(stride).take(height as usize) {
        frame.extend_from_slice(&chunk[..row]);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(align_to(4, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(1080 * 4, 256), 4352);
    }

    #[test]
    fn tight_copy_strips_padding() {
        let mapped = vec![
            1, 2, 3, 4, 99, 99, 99, 99, //
            5, 6, 7, 8, 88, 88, 88, 88,
        ];
        assert_eq!(copy_tight_rows(&mapped, 4, 8, 2).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn tight_copy_rejects_short_buffer() {
        assert!(copy_tight_rows(&[0; 12], 4, 8, 2).is_err());
    }
}
