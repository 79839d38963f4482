use anyhow::{Context, Result};

use crate::records::{FlatTexturedVertex, FlatVertex, ProjectionConstant, check_indices};
use crate::render::{RenderCtx, RenderTarget};

use super::common::{
    GrowableBuffer, PipelineDesc, ProjectionBlock, create_pipeline, create_shader, load_color_attachment,
    projection_bind_group_layout, sampled_texture_entry, sampler_entry,
};
use super::shader_source;
use super::texture_table::GpuImage;

/// Non-instanced triangle lists already in clip space (after the projection
/// constant), either vertex-colored or sampling one [`GpuImage`].
///
/// No depth test: each call records its own pass over whatever is in the
/// color target. Each mode owns its buffers, so call each at most once per
/// frame.
#[derive(Default)]
pub struct FlatRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    color_pipeline: Option<wgpu::RenderPipeline>,
    textured_pipeline: Option<wgpu::RenderPipeline>,

    projection_layout: Option<wgpu::BindGroupLayout>,
    image_layout: Option<wgpu::BindGroupLayout>,

    color: Option<FlatBatch>,
    textured: Option<FlatBatch>,

    /// Bind group for the last image drawn, keyed on [`GpuImage::id`].
    image_group: Option<(u64, wgpu::BindGroup)>,
}

/// Per-mode buffers.
struct FlatBatch {
    projection: ProjectionBlock,
    vertices: GrowableBuffer,
    indices: GrowableBuffer,
}

impl FlatBatch {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &'static str) -> Self {
        Self {
            projection: ProjectionBlock::new(device, layout, label),
            vertices: GrowableBuffer::new(label, wgpu::BufferUsages::VERTEX),
            indices: GrowableBuffer::new(label, wgpu::BufferUsages::INDEX),
        }
    }

    fn upload(&mut self, ctx: &RenderCtx<'_>, constants: &ProjectionConstant, vertices: &[u8], indices: &[u32]) {
        self.projection.write(ctx.queue, constants);
        self.vertices.upload(ctx.device, ctx.queue, vertices);
        self.indices.upload(ctx.device, ctx.queue, bytemuck::cast_slice(indices));
    }
}

impl FlatRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex-colored triangles.
    pub fn render_colored(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        constants: &ProjectionConstant,
        vertices: &[FlatVertex],
        indices: &[u32],
    ) -> Result<()> {
        check_indices(indices, vertices.len()).context("flat color draw")?;
        if indices.is_empty() {
            return Ok(());
        }

        self.ensure_pipelines(ctx)?;
        let Some(layout) = self.projection_layout.as_ref() else { return Ok(()) };
        let batch = self
            .color
            .get_or_insert_with(|| FlatBatch::new(ctx.device, layout, "khodol flat color"));
        batch.upload(ctx, constants, bytemuck::cast_slice(vertices), indices);

        let Some(pipeline) = self.color_pipeline.as_ref() else { return Ok(()) };
        let (Some(vbo), Some(ibo)) = (batch.vertices.get(), batch.indices.get()) else { return Ok(()) };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("khodol flat color pass"),
            color_attachments: &[Some(load_color_attachment(target.color_view))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, batch.projection.bind_group(), &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..indices.len() as u32, 0, 0..1);
        Ok(())
    }

    /// Triangles sampling `image` with its own sampler.
    pub fn render_textured(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        image: &GpuImage,
        constants: &ProjectionConstant,
        vertices: &[FlatTexturedVertex],
        indices: &[u32],
    ) -> Result<()> {
        check_indices(indices, vertices.len()).context("flat textured draw")?;
        if indices.is_empty() {
            return Ok(());
        }

        self.ensure_pipelines(ctx)?;
        self.ensure_image_group(ctx, image);
        let Some(layout) = self.projection_layout.as_ref() else { return Ok(()) };
        let batch = self
            .textured
            .get_or_insert_with(|| FlatBatch::new(ctx.device, layout, "khodol flat textured"));
        batch.upload(ctx, constants, bytemuck::cast_slice(vertices), indices);

        let Some(pipeline) = self.textured_pipeline.as_ref() else { return Ok(()) };
        let Some((_, image_group)) = self.image_group.as_ref() else { return Ok(()) };
        let (Some(vbo), Some(ibo)) = (batch.vertices.get(), batch.indices.get()) else { return Ok(()) };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("khodol flat textured pass"),
            color_attachments: &[Some(load_color_attachment(target.color_view))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, batch.projection.bind_group(), &[]);
        rpass.set_bind_group(1, image_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..indices.len() as u32, 0, 0..1);
        Ok(())
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        if self.pipeline_format == Some(ctx.surface_format) && self.color_pipeline.is_some() {
            return Ok(());
        }

        let projection_layout = self
            .projection_layout
            .get_or_insert_with(|| projection_bind_group_layout(ctx.device, "khodol flat projection bgl"));
        let image_layout = self.image_layout.get_or_insert_with(|| {
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("khodol flat image bgl"),
                entries: &[sampled_texture_entry(0, None), sampler_entry(1)],
            })
        });

        let color_src = shader_source::flat_color().context("flat color stages do not link")?;
        let color_shader = create_shader(ctx.device, "khodol flat color shader", color_src);
        self.color_pipeline = Some(create_pipeline(
            ctx.device,
            PipelineDesc {
                label: "khodol flat color pipeline",
                shader: &color_shader,
                bind_group_layouts: &[&*projection_layout],
                buffers: &[FlatVertex::layout()],
                fragment_entry: "fs_main",
                format: ctx.surface_format,
                depth: None,
            },
        ));

        let textured_src = shader_source::flat_textured().context("flat textured stages do not link")?;
        let textured_shader = create_shader(ctx.device, "khodol flat textured shader", textured_src);
        self.textured_pipeline = Some(create_pipeline(
            ctx.device,
            PipelineDesc {
                label: "khodol flat textured pipeline",
                shader: &textured_shader,
                bind_group_layouts: &[&*projection_layout, &*image_layout],
                buffers: &[FlatTexturedVertex::layout()],
                fragment_entry: "fs_main",
                format: ctx.surface_format,
                depth: None,
            },
        ));

        self.pipeline_format = Some(ctx.surface_format);
        Ok(())
    }

    fn ensure_image_group(&mut self, ctx: &RenderCtx<'_>, image: &GpuImage) {
        if matches!(self.image_group, Some((id, _)) if id == image.id()) {
            return;
        }
        let Some(layout) = self.image_layout.as_ref() else { return };

        let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("khodol flat image"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(image.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(image.sampler()),
                },
            ],
        });
        self.image_group = Some((image.id(), group));
    }
}
