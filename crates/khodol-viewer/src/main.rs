//! Instanced mesh viewer.
//!
//! `khodol-viewer [IMAGE...]` registers each image (PNG/JPEG/BMP) in the
//! texture table, or red, blue and a checkerboard when none are given.
//!
//! Keys: arrows turn, W/S move, L toggles lighting, Escape quits.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use glam::{Mat4, Quat, Vec3, Vec4};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use khodol_engine::camera::Camera;
use khodol_engine::core::{App, AppControl, FrameCtx};
use khodol_engine::device::GpuInit;
use khodol_engine::logging::{LoggingConfig, init_logging};
use khodol_engine::records::{FlatTexturedVertex, FlatVertex, InstanceRecord, MeshData, ProjectionConstant, TextureId};
use khodol_engine::render::{
    FlatRenderer, GpuImage, GpuMesh, GpuTextureTable, InstanceBatch, InstancedMeshRenderer, TextureTableConfig,
};
use khodol_engine::stage::{Image, Lighting, Sampler};
use khodol_engine::window::{Runtime, RuntimeConfig};

const CLEAR: Vec4 = Vec4::new(0.02, 0.02, 0.03, 1.0);
const MOVE_SPEED: f32 = 3.0;
const TURN_SPEED: f32 = 1.5;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let images = load_images(std::env::args().skip(1))?;
    let table = TextureTableConfig::default();
    ensure!(
        images.len() <= table.capacity as usize,
        "{} images given but the texture table holds {}",
        images.len(),
        table.capacity
    );

    let config = RuntimeConfig {
        title: "khodol viewer".to_string(),
        ..Default::default()
    };
    Runtime::run(config, GpuInit::bindless(table.capacity), Viewer::new(images, table))
}

fn load_images(paths: impl Iterator<Item = String>) -> Result<Vec<Image>> {
    let images: Vec<Image> = paths.map(|p| load_image(Path::new(&p))).collect::<Result<_>>()?;
    if !images.is_empty() {
        return Ok(images);
    }

    Ok(vec![
        Image::solid(1, 1, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        Image::solid(1, 1, Vec4::new(0.0, 0.0, 1.0, 1.0)),
        Image::checkerboard(64, 8, Vec4::ONE, Vec4::new(0.1, 0.1, 0.1, 1.0)),
    ])
}

fn load_image(path: &Path) -> Result<Image> {
    let rgba = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let image = Image::from_rgba8_srgb(w, h, rgba.as_raw()).with_context(|| format!("bad image {}", path.display()))?;
    log::info!("loaded {} ({w}x{h})", path.display());
    Ok(image)
}

/// GPU resources, created on the first frame once a device exists.
struct Scene {
    textures: GpuTextureTable,
    ids: Vec<TextureId>,
    quad: GpuMesh,
    cube: GpuMesh,
    overlay_image: GpuImage,
}

impl Scene {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, images: &[Image], config: TextureTableConfig) -> Result<Self> {
        let mut textures = GpuTextureTable::new(device, queue, config)?;
        let ids = images
            .iter()
            .map(|image| textures.register(device, queue, image))
            .collect::<Result<Vec<_>, _>>()?;

        let checker = Image::checkerboard(32, 4, Vec4::new(1.0, 0.8, 0.2, 1.0), Vec4::new(0.2, 0.1, 0.0, 0.6));

        Ok(Self {
            textures,
            ids,
            quad: GpuMesh::new(device, &MeshData::quad(), "quad")?,
            cube: GpuMesh::new(device, &MeshData::cube(), "cube")?,
            overlay_image: GpuImage::new(device, queue, &checker, Sampler::default()),
        })
    }
}

struct Viewer {
    images: Vec<Image>,
    table: TextureTableConfig,
    scene: Option<Scene>,

    camera: Camera,
    held: HashSet<KeyCode>,
    elapsed: f32,

    instanced: InstancedMeshRenderer,
    flat: FlatRenderer,
}

impl Viewer {
    fn new(images: Vec<Image>, table: TextureTableConfig) -> Self {
        Self {
            images,
            table,
            scene: None,
            camera: Camera::new(Vec3::new(0.0, 0.0, 6.0), 800.0 / 600.0),
            held: HashSet::new(),
            elapsed: 0.0,
            instanced: InstancedMeshRenderer::new(),
            flat: FlatRenderer::new(),
        }
    }

    fn steer(&mut self, dt: f32) {
        let held = |k| self.held.contains(&k);
        let (turn, step) = (TURN_SPEED * dt, MOVE_SPEED * dt);
        let (right, left, up, down) = (
            held(KeyCode::ArrowRight),
            held(KeyCode::ArrowLeft),
            held(KeyCode::ArrowUp),
            held(KeyCode::ArrowDown),
        );
        let (forward, backward) = (held(KeyCode::KeyW), held(KeyCode::KeyS));

        if right {
            self.camera.turn_right(turn);
        }
        if left {
            self.camera.turn_left(turn);
        }
        if up {
            self.camera.turn_up(turn);
        }
        if down {
            self.camera.turn_down(turn);
        }
        if forward {
            self.camera.move_forward(step);
        }
        if backward {
            self.camera.move_backward(step);
        }
    }
}

/// A row of quads cycling through every texture, and a row of spinning cubes.
fn instances(ids: &[TextureId], t: f32) -> (Vec<InstanceRecord>, Vec<InstanceRecord>) {
    let n = ids.len().max(1) as f32;
    let spacing = 1.5;
    let x = |i: usize| (i as f32 - (n - 1.0) * 0.5) * spacing;

    let quads = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| InstanceRecord::new(Mat4::from_translation(Vec3::new(x(i), 1.0, 0.0)), id))
        .collect();

    let spin = Quat::from_euler(glam::EulerRot::YXZ, t * 0.7, t * 0.4, 0.0);
    let cubes = ids
        .iter()
        .enumerate()
        .map(|(i, &id)| {
            let model = Mat4::from_rotation_translation(spin, Vec3::new(x(i), -1.0, 0.0));
            InstanceRecord::new(model, id)
        })
        .collect();

    (quads, cubes)
}

const OVERLAY_TRIANGLE: [FlatVertex; 3] = [
    FlatVertex::new([-0.95, -0.95, 0.0, 1.0], [1.0, 0.0, 0.0, 0.8]),
    FlatVertex::new([-0.75, -0.95, 0.0, 1.0], [0.0, 1.0, 0.0, 0.8]),
    FlatVertex::new([-0.85, -0.75, 0.0, 1.0], [0.0, 0.0, 1.0, 0.8]),
];

const OVERLAY_QUAD: [FlatTexturedVertex; 4] = [
    FlatTexturedVertex::new([0.75, -0.95, 0.0, 1.0], [0.0, 1.0]),
    FlatTexturedVertex::new([0.95, -0.95, 0.0, 1.0], [1.0, 1.0]),
    FlatTexturedVertex::new([0.95, -0.75, 0.0, 1.0], [1.0, 0.0]),
    FlatTexturedVertex::new([0.75, -0.75, 0.0, 1.0], [0.0, 0.0]),
];

impl App for Viewer {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        let PhysicalKey::Code(code) = event.physical_key else {
            return AppControl::Continue;
        };

        match event.state {
            ElementState::Pressed => {
                if !event.repeat {
                    match code {
                        KeyCode::Escape => return AppControl::Exit,
                        KeyCode::KeyL => {
                            let lighting = self.instanced.lighting().toggled();
                            self.instanced.set_lighting(lighting);
                            log::info!("lighting: {}", if lighting == Lighting::Unlit { "off" } else { "on" });
                        }
                        _ => {}
                    }
                }
                self.held.insert(code);
            }
            ElementState::Released => {
                self.held.remove(&code);
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if self.scene.is_none() {
            let scene = Scene::new(ctx.gpu.device(), ctx.gpu.queue(), &self.images, self.table)?;
            self.scene = Some(scene);
        }

        let dt = ctx.time.dt;
        self.elapsed += dt;
        self.steer(dt);

        let Some(scene) = self.scene.as_mut() else {
            return Ok(AppControl::Continue);
        };
        let (quads, cubes) = instances(&scene.ids, self.elapsed);

        let camera = &mut self.camera;
        let instanced = &mut self.instanced;
        let flat = &mut self.flat;

        ctx.render(CLEAR, |rctx, target| {
            camera.set_aspect(rctx.aspect());
            let projection = camera.view_projection();

            instanced.render(
                rctx,
                target,
                &mut scene.textures,
                &projection,
                &[InstanceBatch::new(&scene.quad, &quads), InstanceBatch::new(&scene.cube, &cubes)],
            )?;

            let overlay = ProjectionConstant::identity();
            flat.render_colored(rctx, target, &overlay, &OVERLAY_TRIANGLE, &[0, 1, 2])?;
            flat.render_textured(
                rctx,
                target,
                &scene.overlay_image,
                &overlay,
                &OVERLAY_QUAD,
                &[0, 1, 2, 0, 2, 3],
            )?;
            Ok(())
        })
    }
}
