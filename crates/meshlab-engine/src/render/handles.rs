use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use meshlab_core::interaction::handle_half_extent;
use meshlab_core::render_loop::LiveFrame;
use meshlab_core::PointId;

use crate::render::uniforms::{min_binding_size, ViewportUniform};
use crate::render::{RenderCtx, RenderTarget};

const BORDER_WIDTH: f32 = 1.5;
const DRAG_BORDER_WIDTH: f32 = 2.5;
const FILL_ALPHA: f32 = 0.35;
const BORDER_IDLE: [f32; 4] = [1.0, 1.0, 1.0, 0.55];
const BORDER_HOT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Which handle the pointer is on, as far as drawing is concerned.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleHighlight<'a> {
    pub hovered: Option<&'a PointId>,
    pub dragging: Option<&'a PointId>,
}

/// Draws one outlined square per point at its drifted position.
///
/// Boxes match the interaction hit region exactly. The fill is the point's
/// own color; hovered and dragged handles get an opaque, thicker border.
#[derive(Default)]
pub struct HandleRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    viewport_ubo: Option<wgpu::Buffer>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl HandleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: &LiveFrame,
        highlight: HandleHighlight<'_>,
    ) {
        let instances = handle_instances(frame, ctx.viewport, highlight);
        if instances.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_bindings(ctx);

        self.write_viewport_uniform(ctx);
        self.ensure_instance_capacity(ctx, instances.len());

        let Some(instance_vbo) = self.instance_vbo.as_ref() else { return };
        ctx.queue
            .write_buffer(instance_vbo, 0, bytemuck::cast_slice(&instances));

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("meshlab handle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..instances.len() as u32);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.target_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("meshlab handle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/handles.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("meshlab handle bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: min_binding_size::<ViewportUniform>(),
                    },
                    count: None,
                }],
            });

        let pipeline_layout =
            ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("meshlab handle pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("meshlab handle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), HandleInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.target_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.target_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.bind_group = None;
        self.viewport_ubo = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group.is_some() && self.viewport_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let viewport_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("meshlab handle viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("meshlab handle bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        self.viewport_ubo = Some(viewport_ubo);
        self.bind_group = Some(bind_group);
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("meshlab handle quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("meshlab handle quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn write_viewport_uniform(&mut self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        ctx.queue.write_buffer(
            ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                viewport: [ctx.viewport.width.max(1.0), ctx.viewport.height.max(1.0)],
                _pad: [0.0; 2],
            }),
        );
    }

    fn ensure_instance_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(8);
        let new_size = (new_cap * std::mem::size_of::<HandleInstance>()) as u64;
        self.instance_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("meshlab handle instance vbo"),
            size: new_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

fn handle_instances(
    frame: &LiveFrame,
    viewport: meshlab_core::Viewport,
    highlight: HandleHighlight<'_>,
) -> Vec<HandleInstance> {
    if !viewport.is_valid() {
        return Vec::new();
    }
    let half = handle_half_extent(viewport);

    frame
        .handles
        .iter()
        .zip(&frame.field.points)
        .map(|(h, p)| {
            let (x, y) = viewport.from_uv(h.position);
            let dragged = highlight.dragging == Some(&h.id);
            let hot = dragged || highlight.hovered == Some(&h.id);
            HandleInstance {
                center: [x, y],
                half_bw: [half, if dragged { DRAG_BORDER_WIDTH } else { BORDER_WIDTH }],
                fill: [p.color.r, p.color.g, p.color.b, FILL_ALPHA],
                border: if hot { BORDER_HOT } else { BORDER_IDLE },
            }
        })
        .collect()
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Instance data layout (48 bytes):
///
///  offset  0  center   [f32; 2]   loc 1  logical px, top-left origin
///  offset  8  half_bw  [f32; 2]   loc 2  (.x = half side, .y = border width)
///  offset 16  fill     [f32; 4]   loc 3
///  offset 32  border   [f32; 4]   loc 4
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct HandleInstance {
    center: [f32; 2],
    half_bw: [f32; 2],
    fill: [f32; 4],
    border: [f32; 4],
}

impl HandleInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2, // center
        2 => Float32x2, // half_bw
        3 => Float32x4, // fill
        4 => Float32x4  // border
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<HandleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlab_core::render_loop::{RenderLoop, SteppedClock};
    use meshlab_core::{Session, Viewport};

    const VP: Viewport = Viewport::new(800.0, 600.0);

    fn frame(session: &Session) -> LiveFrame {
        RenderLoop::new(SteppedClock::new()).tick(session, None)
    }

    #[test]
    fn one_instance_per_point_at_screen_position() {
        let s = Session::new();
        let f = frame(&s);
        let inst = handle_instances(&f, VP, HandleHighlight::default());
        assert_eq!(inst.len(), s.points().len());

        let (x, y) = VP.from_uv(f.handles[0].position);
        assert_eq!(inst[0].center, [x, y]);
        assert_eq!(inst[0].half_bw[0], handle_half_extent(VP));
        assert_eq!(inst[0].border, BORDER_IDLE);
    }

    #[test]
    fn highlighted_handles_get_hot_border() {
        let s = Session::new();
        let f = frame(&s);
        let hovered = f.handles[1].id.clone();
        let dragged = f.handles[2].id.clone();
        let inst = handle_instances(
            &f,
            VP,
            HandleHighlight {
                hovered: Some(&hovered),
                dragging: Some(&dragged),
            },
        );
        assert_eq!(inst[0].border, BORDER_IDLE);
        assert_eq!((inst[1].border, inst[1].half_bw[1]), (BORDER_HOT, BORDER_WIDTH));
        assert_eq!((inst[2].border, inst[2].half_bw[1]), (BORDER_HOT, DRAG_BORDER_WIDTH));
    }

    #[test]
    fn degenerate_viewport_draws_nothing() {
        let s = Session::new();
        let f = frame(&s);
        assert!(handle_instances(&f, Viewport::new(0.0, 600.0), HandleHighlight::default()).is_empty());
    }
}
