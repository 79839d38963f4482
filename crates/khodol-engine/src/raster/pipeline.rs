use crate::records::{InstanceRecord, MeshData, ProjectionConstant, check_indices, check_texture_ids};
use crate::stage::{
    DrawError, FragmentStage, IoValue, LinkError, Linkage, MeshFragmentStage, MeshVertexStage, Varyings,
    VertexStage, link,
};

use super::framebuffer::{Framebuffer, RasterState};
use super::triangle::{ScreenVertex, clip_near, corner_weights, rasterize};

/// Counters from one draw.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DrawStats {
    pub instances: usize,
    pub triangles: usize,
    /// Fragments that passed the depth test and were blended.
    pub fragments: usize,
    pub depth_rejected: usize,
}

/// A vertex stage and a fragment stage linked through a validated interconnect.
///
/// Execution is single-threaded and deterministic: instances in order,
/// triangles in index order, pixels in scanline order.
///
/// Draws go through [`draw_single`](Self::draw_single) for non-instanced
/// stages and [`draw_instances`](Self::draw_instances) for the textured mesh
/// stages, which validates every texture id first.
#[derive(Debug)]
pub struct SoftwarePipeline<V, F> {
    vertex: V,
    fragment: F,
    linkage: Linkage,
    state: RasterState,
}

impl<V, F> SoftwarePipeline<V, F>
where
    V: VertexStage,
    F: FragmentStage,
{
    /// Links `vertex` outputs to `fragment` inputs; fails with every mismatch.
    pub fn assemble(vertex: V, fragment: F, state: RasterState) -> Result<Self, LinkError> {
        let linkage = link(&V::Output::INTERFACE, &F::Input::INTERFACE)?;
        log::debug!(
            "assembled software pipeline: {} -> {}",
            linkage.vertex_stage(),
            linkage.fragment_stage()
        );
        Ok(Self { vertex, fragment, linkage, state })
    }

    pub fn vertex_stage(&self) -> &V {
        &self.vertex
    }

    pub fn fragment_stage(&self) -> &F {
        &self.fragment
    }

    pub fn state(&self) -> RasterState {
        self.state
    }

    /// Shared body of the public draws. Texture ids are not checked here.
    fn draw_unchecked(
        &self,
        target: &mut Framebuffer,
        constants: &ProjectionConstant,
        vertices: &[V::Vertex],
        indices: &[u32],
        instances: &[V::Instance],
    ) -> Result<DrawStats, DrawError> {
        check_indices(indices, vertices.len())?;

        let (width, height) = (target.width(), target.height());
        let mut stats = DrawStats::default();

        let mut clip = Vec::with_capacity(vertices.len());
        let mut outputs: Vec<Vec<IoValue>> = Vec::with_capacity(vertices.len());
        let mut inputs = Vec::with_capacity(self.linkage.len());
        let mut unreadable = false;

        for instance in instances {
            stats.instances += 1;

            clip.clear();
            outputs.clear();
            for vertex in vertices {
                let out = self.vertex.run(constants, vertex, instance);
                let mut values = Vec::new();
                out.varyings.write_slots(&mut values);
                V::Output::INTERFACE.check_values(&values)?;
                clip.push(out.clip_position);
                outputs.push(values);
            }

            for tri in indices.chunks_exact(3) {
                let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
                let polygon = clip_near([clip[a], clip[b], clip[c]]);
                if polygon.len() < 3 {
                    continue;
                }
                stats.triangles += 1;

                let corners = [outputs[a].as_slice(), outputs[b].as_slice(), outputs[c].as_slice()];
                for k in 1..polygon.len() - 1 {
                    let fan = [polygon[0], polygon[k], polygon[k + 1]];
                    let screen = fan.map(|v| ScreenVertex::from_clip(v.position, width, height));
                    let [Some(s0), Some(s1), Some(s2)] = screen else { continue };
                    rasterize([s0, s1, s2], width, height, |frag| {
                        self.linkage.interpolate(corners, corner_weights(&fan, frag.weights), &mut inputs);
                        let Some(input) = F::Input::read_slots(&inputs) else {
                            unreadable = true;
                            return;
                        };
                        let color = self.fragment.run(&input);
                        if target.write(frag.x, frag.y, frag.depth, color, self.state) {
                            stats.fragments += 1;
                        } else {
                            stats.depth_rejected += 1;
                        }
                    });
                    if unreadable {
                        return Err(DrawError::UnreadableInputs { stage: F::Input::INTERFACE.name });
                    }
                }
            }
        }

        log::trace!(
            "software draw: {} instances, {} triangles, {} fragments ({} depth-rejected)",
            stats.instances,
            stats.triangles,
            stats.fragments,
            stats.depth_rejected
        );
        Ok(stats)
    }
}

impl<V, F> SoftwarePipeline<V, F>
where
    V: VertexStage<Instance = ()>,
    F: FragmentStage,
{
    /// Non-instanced draw.
    pub fn draw_single(
        &self,
        target: &mut Framebuffer,
        constants: &ProjectionConstant,
        vertices: &[V::Vertex],
        indices: &[u32],
    ) -> Result<DrawStats, DrawError> {
        self.draw_unchecked(target, constants, vertices, indices, &[()])
    }
}

impl SoftwarePipeline<MeshVertexStage, MeshFragmentStage<'_>> {
    /// Instanced mesh draw. Every texture id is checked against the bound
    /// table before anything is rasterized.
    pub fn draw_instances(
        &self,
        target: &mut Framebuffer,
        constants: &ProjectionConstant,
        mesh: &MeshData,
        instances: &[InstanceRecord],
    ) -> Result<DrawStats, DrawError> {
        check_texture_ids(instances, self.fragment.textures.len())?;
        self.draw_unchecked(target, constants, &mesh.vertices, &mesh.indices, instances)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};

    use super::*;
    use crate::raster::{BlendMode, DepthTest};
    use crate::records::{FlatVertex, MeshVertex, TextureId};
    use crate::stage::flat::FLAT_COLOR_VARYINGS;
    use crate::stage::{
        FlatColorFragmentStage, FlatColorVertexStage, Image, IoSlot, IoType, Lighting, SlotMismatch,
        StageInterface, TextureTable, VertexOutput,
    };

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);
    const CLEAR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

    fn red_blue_table() -> TextureTable {
        let mut table = TextureTable::default();
        table.push(Image::solid(4, 4, RED));
        table.push(Image::solid(4, 4, BLUE));
        table
    }

    fn at(x: f32, y: f32, id: u32) -> InstanceRecord {
        InstanceRecord::new(Mat4::from_translation(Vec3::new(x, y, 0.0)), TextureId(id))
    }

    #[test]
    fn red_and_blue_quads_land_where_instanced() {
        let table = red_blue_table();
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState::mesh(),
        )
        .unwrap();
        let mut fb = Framebuffer::new(16, 16, CLEAR);

        // Unit quad at x = -0.5 covers NDC x in [-1, 0]; at 0.5 it covers [0, 1].
        let stats = pipeline
            .draw_instances(
                &mut fb,
                &ProjectionConstant::identity(),
                &MeshData::quad(),
                &[at(-0.5, 0.0, 0), at(0.5, 0.0, 1)],
            )
            .unwrap();

        assert_eq!(stats.instances, 2);
        assert_eq!(stats.triangles, 4);
        assert_eq!(fb.count(RED), 64);
        assert_eq!(fb.count(BLUE), 64);
        assert_eq!(fb.count(CLEAR), 256 - 128);
        assert_eq!(fb.pixel(3, 8), RED);
        assert_eq!(fb.pixel(12, 8), BLUE);
        assert_eq!(fb.pixel(8, 1), CLEAR);
        // Nothing in between: every pixel is exactly one of the three colors.
        assert!(fb.pixels().iter().all(|&c| c == RED || c == BLUE || c == CLEAR));
    }

    #[test]
    fn alternating_ids_never_cross_contaminate() {
        let table = red_blue_table();
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState::mesh(),
        )
        .unwrap();
        let mut fb = Framebuffer::new(32, 32, CLEAR);

        // 4x4 grid of half-size quads, ids in a checker pattern.
        let mut instances = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                let center = Vec3::new(-0.75 + 0.5 * i as f32, 0.75 - 0.5 * j as f32, 0.0);
                let model = Mat4::from_translation(center) * Mat4::from_scale(Vec3::splat(0.5));
                instances.push(InstanceRecord::new(model, TextureId((i + j) % 2)));
            }
        }
        pipeline
            .draw_instances(&mut fb, &ProjectionConstant::identity(), &MeshData::quad(), &instances)
            .unwrap();

        for j in 0..4u32 {
            for i in 0..4u32 {
                let expected = if (i + j) % 2 == 0 { RED } else { BLUE };
                for (dx, dy) in [(1, 1), (6, 6), (3, 4)] {
                    assert_eq!(fb.pixel(i * 8 + dx, j * 8 + dy), expected, "cell ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn full_screen_quad_shades_each_pixel_once() {
        let table = red_blue_table();
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState { blend: BlendMode::Replace, depth: DepthTest::Disabled },
        )
        .unwrap();
        let mut fb = Framebuffer::new(8, 8, CLEAR);
        let full = InstanceRecord::new(Mat4::from_scale(Vec3::splat(2.0)), TextureId(0));
        let stats = pipeline
            .draw_instances(&mut fb, &ProjectionConstant::identity(), &MeshData::quad(), &[full])
            .unwrap();
        assert_eq!(stats.fragments, 64);
        assert_eq!(fb.count(RED), 64);
    }

    #[test]
    fn nearer_instance_wins_regardless_of_order() {
        let table = red_blue_table();
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState::mesh(),
        )
        .unwrap();
        // View z = 1 maps to depth 0, z = -1 to depth 1.
        let projection = ProjectionConstant::new(Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0));
        let near = |id| InstanceRecord::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 0.5)), TextureId(id));
        let far = |id| InstanceRecord::new(Mat4::from_translation(Vec3::new(0.0, 0.0, -0.5)), TextureId(id));

        let mut fb = Framebuffer::new(8, 8, CLEAR);
        pipeline
            .draw_instances(&mut fb, &projection, &MeshData::quad(), &[near(0), far(1)])
            .unwrap();
        assert_eq!(fb.pixel(4, 4), RED);

        let mut fb = Framebuffer::new(8, 8, CLEAR);
        let stats = pipeline
            .draw_instances(&mut fb, &projection, &MeshData::quad(), &[far(1), near(0)])
            .unwrap();
        assert_eq!(fb.pixel(4, 4), RED);
        assert_eq!(stats.depth_rejected, 0);
    }

    #[test]
    fn lit_quad_facing_away_gets_ambient_floor() {
        let mut table = TextureTable::default();
        table.push(Image::solid(1, 1, Vec4::ONE));
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Lambert),
            RasterState::mesh(),
        )
        .unwrap();
        let mesh = MeshData::new(
            MeshData::quad()
                .vertices
                .iter()
                .map(|v| MeshVertex::new(v.position, v.uv, [0.0, 0.0, -1.0]))
                .collect(),
            MeshData::quad().indices,
        );
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let full = InstanceRecord::new(Mat4::from_scale(Vec3::splat(2.0)), TextureId(0));
        pipeline
            .draw_instances(&mut fb, &ProjectionConstant::identity(), &mesh, &[full])
            .unwrap();
        assert_eq!(fb.count(Vec4::new(0.2, 0.2, 0.2, 1.0)), 16);
    }

    #[test]
    fn out_of_range_id_fails_before_drawing() {
        let table = red_blue_table();
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState::mesh(),
        )
        .unwrap();
        let mut fb = Framebuffer::new(8, 8, CLEAR);
        let err = pipeline
            .draw_instances(
                &mut fb,
                &ProjectionConstant::identity(),
                &MeshData::quad(),
                &[at(0.0, 0.0, 1), at(0.0, 0.0, 2)],
            )
            .unwrap_err();
        assert_eq!(err, DrawError::TextureOutOfRange { instance: 1, id: 2, len: 2 });
        assert_eq!(fb.count(CLEAR), 64);
    }

    #[test]
    fn malformed_index_lists_are_rejected() {
        let pipeline =
            SoftwarePipeline::assemble(FlatColorVertexStage, FlatColorFragmentStage, RasterState::flat())
                .unwrap();
        let tri = [
            FlatVertex::new([-1.0, -1.0, 0.0, 1.0], [1.0; 4]),
            FlatVertex::new([1.0, -1.0, 0.0, 1.0], [1.0; 4]),
            FlatVertex::new([0.0, 1.0, 0.0, 1.0], [1.0; 4]),
        ];
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let p = ProjectionConstant::identity();
        assert_eq!(pipeline.draw_single(&mut fb, &p, &tri, &[0, 1]), Err(DrawError::IncompleteTriangle(2)));
        assert_eq!(
            pipeline.draw_single(&mut fb, &p, &tri, &[0, 1, 3]),
            Err(DrawError::IndexOutOfRange { position: 2, index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn flat_color_interpolates_between_vertices() {
        let pipeline =
            SoftwarePipeline::assemble(FlatColorVertexStage, FlatColorFragmentStage, RasterState::flat())
                .unwrap();
        let corner = |x: f32, y: f32, c: Vec4| FlatVertex::new([x, y, 0.0, 1.0], c.to_array());
        let verts = [
            corner(-1.0, -1.0, RED),
            corner(1.0, -1.0, BLUE),
            corner(1.0, 1.0, BLUE),
            corner(-1.0, 1.0, RED),
        ];
        let mut fb = Framebuffer::new(8, 2, CLEAR);
        let stats = pipeline
            .draw_single(&mut fb, &ProjectionConstant::identity(), &verts, &[0, 1, 2, 0, 2, 3])
            .unwrap();
        assert_eq!(stats.fragments, 16);
        let left = fb.pixel(0, 0);
        let right = fb.pixel(7, 0);
        assert!(left.x > right.x && left.z < right.z);
        assert!((left.x + left.z - 1.0).abs() < 1e-5);
    }

    // Reads the texture id one location off and expects a slot nobody writes.
    const SHIFTED_ID: StageInterface = StageInterface::new(
        "shifted id reader",
        &[
            IoSlot::perspective(0, "uv", IoType::Vec2),
            IoSlot::flat(3, "texture_id", IoType::U32),
            IoSlot::perspective(4, "tangent", IoType::Vec3),
        ],
    );

    struct ShiftedIdInput;

    impl Varyings for ShiftedIdInput {
        const INTERFACE: StageInterface = SHIFTED_ID;

        fn write_slots(&self, _: &mut Vec<IoValue>) {}

        fn read_slots(_: &[IoValue]) -> Option<Self> {
            Some(Self)
        }
    }

    #[derive(Debug)]
    struct ShiftedIdStage;

    impl FragmentStage for ShiftedIdStage {
        type Input = ShiftedIdInput;

        fn run(&self, _: &ShiftedIdInput) -> Vec4 {
            Vec4::ZERO
        }
    }

    #[test]
    fn assembly_reports_every_mismatch() {
        let err = SoftwarePipeline::assemble(MeshVertexStage, ShiftedIdStage, RasterState::mesh()).unwrap_err();
        assert_eq!(
            err.mismatches(),
            &[
                SlotMismatch::Location { name: "texture_id", written: 2, read: 3 },
                SlotMismatch::Missing { name: "tangent", location: 4 },
            ]
        );
    }

    #[test]
    fn id_past_a_single_slot_table_is_rejected() {
        let mut table = TextureTable::default();
        table.push(Image::solid(1, 1, RED));
        let pipeline = SoftwarePipeline::assemble(
            MeshVertexStage,
            MeshFragmentStage::new(&table, Lighting::Unlit),
            RasterState::mesh(),
        )
        .unwrap();
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let full = InstanceRecord::new(Mat4::from_scale(Vec3::splat(2.0)), TextureId(5));
        let err = pipeline
            .draw_instances(&mut fb, &ProjectionConstant::identity(), &MeshData::quad(), &[full])
            .unwrap_err();
        assert_eq!(err, DrawError::TextureOutOfRange { instance: 0, id: 5, len: 1 });
        assert_eq!(fb.count(CLEAR), 16);
    }

    #[test]
    fn triangle_reaching_behind_the_eye_is_clipped_not_dropped() {
        let pipeline =
            SoftwarePipeline::assemble(FlatColorVertexStage, FlatColorFragmentStage, RasterState::flat())
                .unwrap();
        // The third corner sits behind the eye (w < 0); the near plane cuts the
        // triangle at NDC y = 0, leaving the whole bottom half covered.
        let tri = [
            FlatVertex::new([-1.0, -1.0, 0.5, 1.0], RED.to_array()),
            FlatVertex::new([1.0, -1.0, 0.5, 1.0], RED.to_array()),
            FlatVertex::new([0.0, 3.0, -1.5, -1.0], RED.to_array()),
        ];
        let mut fb = Framebuffer::new(8, 8, CLEAR);
        let stats = pipeline
            .draw_single(&mut fb, &ProjectionConstant::identity(), &tri, &[0, 1, 2])
            .unwrap();
        assert_eq!(stats.triangles, 1);
        assert_eq!(stats.fragments, 32);
        assert_eq!(fb.count(CLEAR), 32);
        for x in 0..8 {
            assert_eq!(fb.pixel(x, 3), CLEAR);
            assert_ne!(fb.pixel(x, 4), CLEAR);
        }
    }

    #[test]
    fn triangle_fully_behind_the_eye_draws_nothing() {
        let pipeline =
            SoftwarePipeline::assemble(FlatColorVertexStage, FlatColorFragmentStage, RasterState::flat())
                .unwrap();
        let behind = |x: f32, y: f32| FlatVertex::new([x, y, -0.5, -1.0], RED.to_array());
        let tri = [behind(-1.0, -1.0), behind(1.0, -1.0), behind(0.0, 1.0)];
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let stats = pipeline
            .draw_single(&mut fb, &ProjectionConstant::identity(), &tri, &[0, 1, 2])
            .unwrap();
        assert_eq!(stats.triangles, 0);
        assert_eq!(fb.count(CLEAR), 16);
    }

    // Declares the flat color slot but never writes it.
    #[derive(Debug)]
    struct SilentColor;

    impl Varyings for SilentColor {
        const INTERFACE: StageInterface = FLAT_COLOR_VARYINGS;

        fn write_slots(&self, _: &mut Vec<IoValue>) {}

        fn read_slots(_: &[IoValue]) -> Option<Self> {
            None
        }
    }

    #[derive(Debug)]
    struct SilentVertexStage;

    impl VertexStage for SilentVertexStage {
        type Vertex = FlatVertex;
        type Instance = ();
        type Output = SilentColor;

        fn run(&self, _: &ProjectionConstant, vertex: &FlatVertex, _: &()) -> VertexOutput<SilentColor> {
            VertexOutput { clip_position: vertex.position(), varyings: SilentColor }
        }
    }

    #[derive(Debug)]
    struct SilentFragmentStage;

    impl FragmentStage for SilentFragmentStage {
        type Input = SilentColor;

        fn run(&self, _: &SilentColor) -> Vec4 {
            Vec4::ONE
        }
    }

    fn full_screen_triangle() -> [FlatVertex; 3] {
        [
            FlatVertex::new([-1.0, -1.0, 0.0, 1.0], [1.0; 4]),
            FlatVertex::new([3.0, -1.0, 0.0, 1.0], [1.0; 4]),
            FlatVertex::new([-1.0, 3.0, 0.0, 1.0], [1.0; 4]),
        ]
    }

    #[test]
    fn short_vertex_outputs_fail_the_draw() {
        let pipeline =
            SoftwarePipeline::assemble(SilentVertexStage, SilentFragmentStage, RasterState::flat()).unwrap();
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let err = pipeline
            .draw_single(&mut fb, &ProjectionConstant::identity(), &full_screen_triangle(), &[0, 1, 2])
            .unwrap_err();
        assert_eq!(err, DrawError::OutputCount { stage: "flat color varyings", expected: 1, written: 0 });
        assert_eq!(fb.count(CLEAR), 16);
    }

    #[test]
    fn unreadable_fragment_inputs_fail_the_draw() {
        let pipeline =
            SoftwarePipeline::assemble(FlatColorVertexStage, SilentFragmentStage, RasterState::flat()).unwrap();
        let mut fb = Framebuffer::new(4, 4, CLEAR);
        let err = pipeline
            .draw_single(&mut fb, &ProjectionConstant::identity(), &full_screen_triangle(), &[0, 1, 2])
            .unwrap_err();
        assert_eq!(err, DrawError::UnreadableInputs { stage: "flat color varyings" });
    }
}
