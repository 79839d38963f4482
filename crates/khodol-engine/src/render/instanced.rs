use anyhow::{Context, Result, bail};

use crate::device::{bindless_features, require_features};
use crate::records::{InstanceRecord, MeshVertex, ProjectionConstant, check_texture_ids};
use crate::render::{RenderCtx, RenderTarget};
use crate::stage::Lighting;

use super::common::{
    GrowableBuffer, PipelineDesc, ProjectionBlock, create_pipeline, create_shader, depth_state,
    load_color_attachment, projection_bind_group_layout,
};
use super::mesh::GpuMesh;
use super::shader_source;
use super::texture_table::GpuTextureTable;

/// Instances of one mesh, drawn with a single instanced call.
#[derive(Clone, Copy)]
pub struct InstanceBatch<'a> {
    pub mesh: &'a GpuMesh,
    pub instances: &'a [InstanceRecord],
}

impl<'a> InstanceBatch<'a> {
    #[inline]
    pub fn new(mesh: &'a GpuMesh, instances: &'a [InstanceRecord]) -> Self {
        Self { mesh, instances }
    }
}

/// Draws instanced meshes textured through a [`GpuTextureTable`].
///
/// Bindings:
/// - group 0: projection constant (vertex)
/// - group 1: texture array + sampler (fragment), owned by the table
///
/// Vertex buffers: slot 0 = [`MeshVertex`], slot 1 = [`InstanceRecord`].
///
/// All batches of one `render` call share one instance buffer upload and one
/// pass; call it once per frame.
#[derive(Default)]
pub struct InstancedMeshRenderer {
    /// (surface format, texture table id) the pipelines were built for.
    pipeline_key: Option<(wgpu::TextureFormat, u64)>,
    lit_pipeline: Option<wgpu::RenderPipeline>,
    unlit_pipeline: Option<wgpu::RenderPipeline>,

    projection_layout: Option<wgpu::BindGroupLayout>,
    projection: Option<ProjectionBlock>,

    instances: Option<GrowableBuffer>,

    lighting: Lighting,
    warned_empty: bool,
}

impl InstancedMeshRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lighting(&self) -> Lighting {
        self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        if lighting != self.lighting {
            log::debug!("instanced mesh lighting: {lighting:?}");
        }
        self.lighting = lighting;
    }

    /// Records one depth-tested pass drawing every batch.
    ///
    /// Fails before recording anything when an instance names a texture id
    /// past the table's registered textures, or when the target has no depth
    /// attachment.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        textures: &mut GpuTextureTable,
        constants: &ProjectionConstant,
        batches: &[InstanceBatch<'_>],
    ) -> Result<()> {
        for (i, batch) in batches.iter().enumerate() {
            check_texture_ids(batch.instances, textures.len()).with_context(|| format!("instance batch {i}"))?;
        }

        let total: usize = batches.iter().map(|b| b.instances.len()).sum();
        if total == 0 {
            if !self.warned_empty {
                log::debug!("InstancedMeshRenderer: nothing to draw");
                self.warned_empty = true;
            }
            return Ok(());
        }

        let Some(depth_view) = target.depth_view else {
            bail!("instanced mesh pass needs a depth attachment");
        };

        self.ensure_pipelines(ctx, textures)?;
        self.ensure_bindings(ctx);

        let Some(projection) = self.projection.as_ref() else { return Ok(()) };
        projection.write(ctx.queue, constants);

        let mut records = Vec::with_capacity(total);
        for batch in batches {
            records.extend_from_slice(batch.instances);
        }
        let instance_buffer = self
            .instances
            .get_or_insert_with(|| GrowableBuffer::new("khodol instance vbo", wgpu::BufferUsages::VERTEX));
        instance_buffer.upload(ctx.device, ctx.queue, bytemuck::cast_slice(&records));

        let pipeline = match self.lighting {
            Lighting::Lambert => self.lit_pipeline.as_ref(),
            Lighting::Unlit => self.unlit_pipeline.as_ref(),
        };
        let Some(pipeline) = pipeline else { return Ok(()) };
        let Some(instance_vbo) = instance_buffer.get() else { return Ok(()) };
        let texture_group = textures.bind_group(ctx.device);

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("khodol instanced mesh pass"),
            color_attachments: &[Some(load_color_attachment(target.color_view))],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, projection.bind_group(), &[]);
        rpass.set_bind_group(1, texture_group, &[]);
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));

        let mut start = 0u32;
        for batch in batches {
            let end = start + batch.instances.len() as u32;
            if end > start {
                rpass.set_vertex_buffer(0, batch.mesh.vertex_buffer().slice(..));
                rpass.set_index_buffer(batch.mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..batch.mesh.index_count(), 0, start..end);
            }
            start = end;
        }

        log::trace!("instanced mesh pass: {} batches, {total} instances", batches.len());
        Ok(())
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>, textures: &GpuTextureTable) -> Result<()> {
        let key = (ctx.surface_format, textures.id());
        if self.pipeline_key == Some(key) && self.lit_pipeline.is_some() {
            return Ok(());
        }

        require_features(ctx.device.features(), bindless_features(), "instanced mesh pipeline")?;

        let source = shader_source::instanced().context("instanced mesh stages do not link")?;
        let shader = create_shader(ctx.device, "khodol instanced shader", source);

        let projection_layout = self
            .projection_layout
            .get_or_insert_with(|| projection_bind_group_layout(ctx.device, "khodol projection bgl"));
        let bind_group_layouts = [&*projection_layout, textures.layout()];
        let buffers = [MeshVertex::layout(), InstanceRecord::layout()];

        let build = |lighting: Lighting| {
            create_pipeline(
                ctx.device,
                PipelineDesc {
                    label: "khodol instanced mesh pipeline",
                    shader: &shader,
                    bind_group_layouts: &bind_group_layouts,
                    buffers: &buffers,
                    fragment_entry: lighting.fragment_entry_point(),
                    format: ctx.surface_format,
                    depth: Some(depth_state()),
                },
            )
        };
        self.lit_pipeline = Some(build(Lighting::Lambert));
        self.unlit_pipeline = Some(build(Lighting::Unlit));
        self.pipeline_key = Some(key);
        Ok(())
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.projection.is_some() {
            return;
        }
        let Some(layout) = self.projection_layout.as_ref() else { return };
        self.projection = Some(ProjectionBlock::new(ctx.device, layout, "khodol instanced projection"));
    }
}
